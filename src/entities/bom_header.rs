use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Recipe producing `output_quantity_kg` of a product from its lines.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bom_headers")]
#[schema(as = BomHeader)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub bom_code: String,
    pub product_name: String,
    pub count_product_id: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub output_quantity_kg: Decimal,
    pub revision: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bom_line::Entity")]
    Lines,
}

impl Related<super::bom_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
