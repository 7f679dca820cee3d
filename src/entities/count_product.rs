use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A yarn count (e.g. `30s`) the mill produces and sells.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "count_products")]
#[schema(as = CountProduct)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub count_name: String,
    pub yarn_type: String,
    pub quality: Option<String>,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    #[serde(with = "rust_decimal::serde::float_option", default)]
    #[schema(value_type = Option<f64>)]
    pub rate_per_kg: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
