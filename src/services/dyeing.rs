use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::{
    checked, contains_ci, ensure_non_negative, ensure_positive, next_document_number, round_dp,
    PageRequest, Paged,
};
use crate::{
    entities::{
        count_product::Entity as CountProductEntity,
        dyeing_firm::{self, Entity as DyeingFirmEntity},
        dyeing_order::{self, DyeingStatus, Entity as DyeingOrderEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDyeingFirm {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub contact_person: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDyeingFirm {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub contact_person: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDyeingOrder {
    pub firm_id: i32,
    pub count_product_id: Option<i32>,
    #[validate(length(min = 1, max = 64))]
    pub shade: String,
    #[schema(value_type = f64)]
    pub quantity_sent_kg: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub rate_per_kg: Decimal,
    pub sent_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDyeingOrder {
    pub firm_id: Option<i32>,
    pub count_product_id: Option<i32>,
    #[validate(length(min = 1, max = 64))]
    pub shade: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub quantity_sent_kg: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub rate_per_kg: Option<Decimal>,
    pub sent_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DyeingStatusUpdate {
    pub status: DyeingStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DyeingReceipt {
    #[schema(value_type = f64)]
    pub quantity_kg: Decimal,
    pub received_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct DyeingFirmFilter {
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DyeingOrderFilter {
    pub firm_id: Option<i32>,
    pub status: Option<DyeingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Order with its derived shortage and amount
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DyeingOrderView {
    #[serde(flatten)]
    pub order: dyeing_order::Model,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub shortage_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

impl From<dyeing_order::Model> for DyeingOrderView {
    fn from(order: dyeing_order::Model) -> Self {
        // Both factors are bounded by the numeric(16, 4) columns
        let shortage_kg = round_dp(order.quantity_sent_kg - order.quantity_received_kg, 3);
        let amount = round_dp(order.quantity_received_kg * order.rate_per_kg, 2);
        Self {
            order,
            shortage_kg,
            amount,
        }
    }
}

/// Status after booking a receipt that brings the total to `received`
fn status_after_receipt(sent: Decimal, received: Decimal) -> DyeingStatus {
    if received >= sent {
        DyeingStatus::Completed
    } else {
        DyeingStatus::PartiallyReceived
    }
}

/// Dyeing firms and the orders sent out to them
#[derive(Clone)]
pub struct DyeingService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl DyeingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    // Firms

    pub async fn list_firms(
        &self,
        filter: &DyeingFirmFilter,
        page: PageRequest,
    ) -> Result<Paged<dyeing_firm::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(active) = filter.active {
            condition = condition.add(dyeing_firm::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(contains_ci(dyeing_firm::Column::Name, search))
                    .add(contains_ci(dyeing_firm::Column::ContactPerson, search)),
            );
        }

        let query = DyeingFirmEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(dyeing_firm::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    pub async fn get_firm(&self, id: i32) -> Result<dyeing_firm::Model, ServiceError> {
        DyeingFirmEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("dyeing firm", id))
    }

    async fn ensure_firm_name_free(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = DyeingFirmEntity::find().filter(dyeing_firm::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(dyeing_firm::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "dyeing firm '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_firm(
        &self,
        input: CreateDyeingFirm,
    ) -> Result<dyeing_firm::Model, ServiceError> {
        input.validate()?;
        let name = input.name.trim().to_string();
        self.ensure_firm_name_free(&name, None).await?;

        let now = Utc::now();
        let firm = dyeing_firm::ActiveModel {
            name: Set(name),
            contact_person: Set(input.contact_person),
            phone: Set(input.phone),
            address: Set(input.address),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(id = firm.id, "Dyeing firm created");
        Ok(firm)
    }

    #[instrument(skip(self, input))]
    pub async fn update_firm(
        &self,
        id: i32,
        input: UpdateDyeingFirm,
    ) -> Result<dyeing_firm::Model, ServiceError> {
        input.validate()?;
        let current = self.get_firm(id).await?;
        let mut active: dyeing_firm::ActiveModel = current.into();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            self.ensure_firm_name_free(&name, Some(id)).await?;
            active.name = Set(name);
        }
        if let Some(contact) = input.contact_person {
            active.contact_person = Set(Some(contact));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_firm(&self, id: i32) -> Result<(), ServiceError> {
        let firm = self.get_firm(id).await?;
        let orders = DyeingOrderEntity::find()
            .filter(dyeing_order::Column::FirmId.eq(id))
            .count(&*self.db)
            .await?;
        if orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "dyeing firm '{}' has {} order(s)",
                firm.name, orders
            )));
        }
        DyeingFirmEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "Dyeing firm deleted");
        Ok(())
    }

    // Orders

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: &DyeingOrderFilter,
        page: PageRequest,
    ) -> Result<Paged<DyeingOrderView>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(firm_id) = filter.firm_id {
            condition = condition.add(dyeing_order::Column::FirmId.eq(firm_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(dyeing_order::Column::Status.eq(status));
        }
        if let Some(from) = filter.date_from {
            condition = condition.add(dyeing_order::Column::CreatedAt.gte(from.and_time(NaiveTime::MIN).and_utc()));
        }
        if let Some(to) = filter.date_to.and_then(|d| d.succ_opt()) {
            condition = condition.add(dyeing_order::Column::CreatedAt.lt(to.and_time(NaiveTime::MIN).and_utc()));
        }

        let query = DyeingOrderEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_desc(dyeing_order::Column::CreatedAt)
            .order_by_desc(dyeing_order::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total }.map(DyeingOrderView::from))
    }

    async fn find_order(&self, id: i32) -> Result<dyeing_order::Model, ServiceError> {
        DyeingOrderEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("dyeing order", id))
    }

    pub async fn get_order(&self, id: i32) -> Result<DyeingOrderView, ServiceError> {
        Ok(self.find_order(id).await?.into())
    }

    async fn ensure_active_firm(&self, firm_id: i32) -> Result<dyeing_firm::Model, ServiceError> {
        let firm = self.get_firm(firm_id).await?;
        if !firm.is_active {
            return Err(ServiceError::ValidationError(format!(
                "dyeing firm '{}' is inactive",
                firm.name
            )));
        }
        Ok(firm)
    }

    async fn ensure_count_product(&self, id: Option<i32>) -> Result<(), ServiceError> {
        if let Some(id) = id {
            CountProductEntity::find_by_id(id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("count product", id))?;
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(firm_id = input.firm_id))]
    pub async fn create_order(
        &self,
        input: CreateDyeingOrder,
    ) -> Result<DyeingOrderView, ServiceError> {
        input.validate()?;
        ensure_positive("quantity_sent_kg", input.quantity_sent_kg)?;
        ensure_non_negative("rate_per_kg", input.rate_per_kg)?;
        self.ensure_active_firm(input.firm_id).await?;
        self.ensure_count_product(input.count_product_id).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let order_number = next_document_number::<DyeingOrderEntity, _>(
            &txn,
            dyeing_order::Column::OrderNumber,
            "DYE",
            now.date_naive(),
        )
        .await?;

        let order = dyeing_order::ActiveModel {
            order_number: Set(order_number),
            firm_id: Set(input.firm_id),
            count_product_id: Set(input.count_product_id),
            shade: Set(input.shade.trim().to_string()),
            quantity_sent_kg: Set(input.quantity_sent_kg),
            quantity_received_kg: Set(Decimal::ZERO),
            rate_per_kg: Set(input.rate_per_kg),
            status: Set(DyeingStatus::Pending),
            sent_date: Set(input.sent_date),
            expected_date: Set(input.expected_date),
            received_date: Set(None),
            remarks: Set(input.remarks),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(id = order.id, order_number = %order.order_number, "Dyeing order created");
        Ok(order.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_order(
        &self,
        id: i32,
        input: UpdateDyeingOrder,
    ) -> Result<DyeingOrderView, ServiceError> {
        input.validate()?;
        if let Some(quantity) = input.quantity_sent_kg {
            ensure_positive("quantity_sent_kg", quantity)?;
        }
        if let Some(rate) = input.rate_per_kg {
            ensure_non_negative("rate_per_kg", rate)?;
        }
        let current = self.find_order(id).await?;

        let changes_quantity_or_firm = input.quantity_sent_kg.is_some() || input.firm_id.is_some();
        if changes_quantity_or_firm && current.status != DyeingStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "order {} is {}; only pending orders can change quantity or firm",
                current.order_number,
                current.status
            )));
        }
        if let Some(firm_id) = input.firm_id {
            self.ensure_active_firm(firm_id).await?;
        }
        self.ensure_count_product(input.count_product_id).await?;

        let mut active: dyeing_order::ActiveModel = current.into();
        if let Some(firm_id) = input.firm_id {
            active.firm_id = Set(firm_id);
        }
        if let Some(product) = input.count_product_id {
            active.count_product_id = Set(Some(product));
        }
        if let Some(shade) = input.shade {
            active.shade = Set(shade.trim().to_string());
        }
        if let Some(quantity) = input.quantity_sent_kg {
            active.quantity_sent_kg = Set(quantity);
        }
        if let Some(rate) = input.rate_per_kg {
            active.rate_per_kg = Set(rate);
        }
        if let Some(date) = input.sent_date {
            active.sent_date = Set(Some(date));
        }
        if let Some(date) = input.expected_date {
            active.expected_date = Set(Some(date));
        }
        if let Some(remarks) = input.remarks {
            active.remarks = Set(Some(remarks));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: i32,
        next: DyeingStatus,
    ) -> Result<DyeingOrderView, ServiceError> {
        let current = self.find_order(id).await?;
        let previous = current.status;
        if !previous.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move dyeing order {} from {} to {}",
                current.order_number,
                previous,
                next
            )));
        }

        let stamp_sent = next == DyeingStatus::Sent && current.sent_date.is_none();
        let mut active: dyeing_order::ActiveModel = current.into();
        active.status = Set(next);
        if stamp_sent {
            active.sent_date = Set(Some(Utc::now().date_naive()));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.announce(&updated, previous);
        Ok(updated.into())
    }

    /// Book yarn received back from the dyer
    #[instrument(skip(self, input), fields(quantity_kg = %input.quantity_kg))]
    pub async fn record_receipt(
        &self,
        id: i32,
        input: DyeingReceipt,
    ) -> Result<DyeingOrderView, ServiceError> {
        ensure_positive("quantity_kg", input.quantity_kg)?;
        let txn = self.db.begin().await?;
        let current = DyeingOrderEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("dyeing order", id))?;

        if !current.status.accepts_receipts() {
            return Err(ServiceError::InvalidStatus(format!(
                "dyeing order {} is {}; receipts are accepted only while at the dyer",
                current.order_number,
                current.status
            )));
        }

        let received = round_dp(
            checked(
                current.quantity_received_kg.checked_add(input.quantity_kg),
                "received quantity",
            )?,
            3,
        );
        if received > current.quantity_sent_kg {
            return Err(ServiceError::ValidationError(format!(
                "receipt would bring received quantity to {} kg, above the {} kg sent",
                received, current.quantity_sent_kg
            )));
        }

        let previous = current.status;
        let next = status_after_receipt(current.quantity_sent_kg, received);
        let mut active: dyeing_order::ActiveModel = current.into();
        active.quantity_received_kg = Set(received);
        active.status = Set(next);
        active.received_date = Set(Some(
            input.received_date.unwrap_or_else(|| Utc::now().date_naive()),
        ));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(id, %received, "Dyeing receipt recorded");
        if previous != next {
            self.announce(&updated, previous);
        }
        Ok(updated.into())
    }

    fn announce(&self, order: &dyeing_order::Model, previous: DyeingStatus) {
        info!(
            order_number = %order.order_number,
            from = %previous,
            to = %order.status,
            "Dyeing order status changed"
        );
        self.event_sender.emit(Event::DyeingOrderStatusChanged {
            order_id: order.id,
            order_number: order.order_number.clone(),
            old_status: previous.to_string(),
            new_status: order.status.to_string(),
        });
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: i32) -> Result<(), ServiceError> {
        let order = self.find_order(id).await?;
        if !matches!(order.status, DyeingStatus::Pending | DyeingStatus::Cancelled) {
            return Err(ServiceError::Conflict(format!(
                "dyeing order {} is {}; only pending or cancelled orders can be deleted",
                order.order_number,
                order.status
            )));
        }
        DyeingOrderEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "Dyeing order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(sent: Decimal, received: Decimal, rate: Decimal) -> dyeing_order::Model {
        dyeing_order::Model {
            id: 1,
            order_number: "DYE-20240501-0001".to_string(),
            firm_id: 1,
            count_product_id: None,
            shade: "navy".to_string(),
            quantity_sent_kg: sent,
            quantity_received_kg: received,
            rate_per_kg: rate,
            status: DyeingStatus::PartiallyReceived,
            sent_date: None,
            expected_date: None,
            received_date: None,
            remarks: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn view_derives_shortage_and_amount() {
        let view = DyeingOrderView::from(order(dec!(500), dec!(320.5), dec!(42)));
        assert_eq!(view.shortage_kg, dec!(179.5));
        assert_eq!(view.amount, dec!(13461));
    }

    #[test]
    fn amount_rounds_exact_midpoints_up() {
        // 1.005 has no exact binary form; the amount must still round to 1.01
        let view = DyeingOrderView::from(order(dec!(5), dec!(1.0), dec!(1.005)));
        assert_eq!(view.amount, dec!(1.01));
        let view = DyeingOrderView::from(order(dec!(5), dec!(0.1), dec!(0.2)));
        assert_eq!(view.amount, dec!(0.02));
        assert_eq!(view.shortage_kg, dec!(4.9));
    }

    #[test]
    fn full_receipt_completes_the_order() {
        assert_eq!(status_after_receipt(dec!(100), dec!(100.000)), DyeingStatus::Completed);
        assert_eq!(status_after_receipt(dec!(100), dec!(99.999)), DyeingStatus::PartiallyReceived);
        assert_eq!(
            status_after_receipt(dec!(0.3), dec!(0.1) + dec!(0.2)),
            DyeingStatus::Completed
        );
    }

    #[test]
    fn view_serializes_flat() {
        let json = serde_json::to_value(DyeingOrderView::from(order(dec!(10), dec!(4), dec!(2.5)))).unwrap();
        assert_eq!(json["order_number"], "DYE-20240501-0001");
        assert_eq!(json["status"], "partially_received");
        assert_eq!(json["shortage_kg"], 6.0);
        assert_eq!(json["amount"], 10.0);
    }
}
