use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A spinning machine installed in one of the ASU units.
///
/// `(unit, machine_no)` is unique; the count/yarn/speed fields always mirror the
/// newest configuration version.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asu_machines")]
#[schema(as = AsuMachine)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub unit: i32,
    pub machine_no: i32,
    pub machine_name: String,
    pub count: String,
    pub yarn_type: String,
    pub spindles: i32,
    pub speed: f64,
    /// Expected kg per shift at 100% efficiency
    pub production_at_100: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::machine_configuration::Entity")]
    Configurations,
    #[sea_orm(has_many = "super::production_entry::Entity")]
    ProductionEntries,
}

impl Related<super::machine_configuration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Configurations.def()
    }
}

impl Related<super::production_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
