use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "asu_machine_configurations")]
#[schema(as = MachineConfiguration)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub machine_id: i32,
    pub version: i32,
    pub count: String,
    pub yarn_type: String,
    pub spindles: i32,
    pub speed: f64,
    pub production_at_100: f64,
    pub effective_from: NaiveDate,
    /// `None` while this is the version in force
    pub effective_to: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Whether this version was in force on `date` (`effective_to` is exclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map_or(true, |end| date < end)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asu_machine::Entity",
        from = "Column::MachineId",
        to = "super::asu_machine::Column::Id",
        on_delete = "Cascade"
    )]
    Machine,
}

impl Related<super::asu_machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(from: (i32, u32, u32), to: Option<(i32, u32, u32)>) -> Model {
        let d = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        Model {
            id: 1,
            machine_id: 1,
            version: 1,
            count: "30s".into(),
            yarn_type: "cotton".into(),
            spindles: 480,
            speed: 16000.0,
            production_at_100: 120.0,
            effective_from: d(from),
            effective_to: to.map(d),
            notes: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn closed_version_excludes_its_end_date() {
        let v = version((2024, 1, 1), Some((2024, 2, 1)));
        assert!(v.covers(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(v.covers(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        assert!(!v.covers(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(!v.covers(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }

    #[test]
    fn open_version_covers_everything_after_start() {
        let v = version((2024, 3, 10), None);
        assert!(v.covers(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(!v.covers(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
    }
}
