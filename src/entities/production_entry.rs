use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Shift {
    #[sea_orm(string_value = "day")]
    Day,
    #[sea_orm(string_value = "night")]
    Night,
}

impl Shift {
    /// Day shift sorts before night shift on the same date.
    pub fn ordinal(self) -> u8 {
        match self {
            Shift::Day => 0,
            Shift::Night => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Day => "day",
            Shift::Night => "night",
        }
    }
}

/// One shift's actual vs. theoretical output for one ASU machine.
///
/// Unique on `(unit, machine_id, date, shift)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asu_production_entries")]
#[schema(as = ProductionEntry)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub unit: i32,
    pub machine_id: i32,
    pub date: NaiveDate,
    pub shift: Shift,
    pub actual_production: f64,
    pub theoretical_production: f64,
    pub percentage: f64,
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asu_machine::Entity",
        from = "Column::MachineId",
        to = "super::asu_machine::Column::Id"
    )]
    Machine,
}

impl Related<super::asu_machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
