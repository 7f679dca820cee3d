use chrono::{DateTime, NaiveDate, Utc};
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
pub enum DyeingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "in_process")]
    InProcess,
    #[sea_orm(string_value = "partially_received")]
    PartiallyReceived,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DyeingStatus {
    pub fn can_transition_to(self, next: DyeingStatus) -> bool {
        use DyeingStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Cancelled)
                | (Sent, InProcess)
                | (Sent, Cancelled)
                | (InProcess, PartiallyReceived)
                | (InProcess, Completed)
                | (InProcess, Cancelled)
                | (PartiallyReceived, Completed)
        )
    }

    /// States in which yarn is at the dyer and receipts may be booked.
    pub fn accepts_receipts(self) -> bool {
        matches!(
            self,
            DyeingStatus::Sent | DyeingStatus::InProcess | DyeingStatus::PartiallyReceived
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "dyeing_orders")]
#[schema(as = DyeingOrder)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_number: String,
    pub firm_id: i32,
    pub count_product_id: Option<i32>,
    pub shade: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity_sent_kg: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity_received_kg: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub rate_per_kg: Decimal,
    pub status: DyeingStatus,
    pub sent_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    pub received_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dyeing_firm::Entity",
        from = "Column::FirmId",
        to = "super::dyeing_firm::Column::Id"
    )]
    Firm,
    #[sea_orm(
        belongs_to = "super::count_product::Entity",
        from = "Column::CountProductId",
        to = "super::count_product::Column::Id"
    )]
    CountProduct,
}

impl Related<super::dyeing_firm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Firm.def()
    }
}

impl Related<super::count_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CountProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::DyeingStatus::*;
    use super::*;

    #[test]
    fn forward_flow_is_allowed() {
        assert!(Pending.can_transition_to(Sent));
        assert!(Sent.can_transition_to(InProcess));
        assert!(InProcess.can_transition_to(PartiallyReceived));
        assert!(PartiallyReceived.can_transition_to(Completed));
    }

    #[test]
    fn terminal_and_backward_moves_are_rejected() {
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Sent.can_transition_to(Pending));
        assert!(!PartiallyReceived.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn receipts_only_while_at_dyer() {
        assert!(!Pending.accepts_receipts());
        assert!(Sent.accepts_receipts());
        assert!(PartiallyReceived.accepts_receipts());
        assert!(!Completed.accepts_receipts());
    }
}
