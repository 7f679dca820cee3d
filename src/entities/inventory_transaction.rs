use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionKind {
    #[sea_orm(string_value = "opening")]
    Opening,
    #[sea_orm(string_value = "receive")]
    Receive,
    #[sea_orm(string_value = "issue")]
    Issue,
    #[sea_orm(string_value = "set")]
    Set,
}

/// Ledger row; `balance_after` is the item quantity once this row applied.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory_transactions")]
#[schema(as = InventoryTransaction)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub item_id: i32,
    pub kind: TransactionKind,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity_change: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub balance_after: Decimal,
    pub reason: String,
    pub reference: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
