use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bom_lines")]
#[schema(as = BomLine)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bom_id: i32,
    pub inventory_item_id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity_per_batch: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub wastage_percent: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bom_header::Entity",
        from = "Column::BomId",
        to = "super::bom_header::Column::Id",
        on_delete = "Cascade"
    )]
    BomHeader,
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::InventoryItemId",
        to = "super::inventory_item::Column::Id"
    )]
    Item,
}

impl Related<super::bom_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BomHeader.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
