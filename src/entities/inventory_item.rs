use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemCategory {
    #[sea_orm(string_value = "raw_material")]
    RawMaterial,
    #[sea_orm(string_value = "yarn")]
    Yarn,
    #[sea_orm(string_value = "dye")]
    Dye,
    #[sea_orm(string_value = "chemical")]
    Chemical,
    #[sea_orm(string_value = "spare_part")]
    SparePart,
    #[sea_orm(string_value = "packing")]
    Packing,
    #[sea_orm(string_value = "finished_good")]
    FinishedGood,
}

/// Stock-keeping record. `quantity` only changes through adjustments, each of
/// which writes an `inventory_transactions` row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory_items")]
#[schema(as = InventoryItem)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    pub category: ItemCategory,
    pub unit_of_measure: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub reorder_level: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_cost: Decimal,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    Transactions,
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
