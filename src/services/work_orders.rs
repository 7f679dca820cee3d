use chrono::{NaiveDate, Utc};
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

use super::{ensure_positive, next_document_number, round_dp, PageRequest, Paged};
use crate::{
    entities::{
        count_product::Entity as CountProductEntity,
        work_order::{self, Entity as WorkOrderEntity, WorkOrderPriority, WorkOrderStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWorkOrder {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub count_product_id: Option<i32>,
    #[schema(value_type = f64)]
    pub target_quantity_kg: Decimal,
    #[serde(default)]
    pub priority: WorkOrderPriority,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateWorkOrder {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub count_product_id: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub target_quantity_kg: Option<Decimal>,
    pub priority: Option<WorkOrderPriority>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WorkOrderStatusUpdate {
    pub status: WorkOrderStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderView {
    #[serde(flatten)]
    pub order: work_order::Model,
    /// Produced over target in percent, capped at 100
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub progress_percent: Decimal,
}

pub fn progress_percent(produced: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = produced
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|v| v.checked_div(target))
        .unwrap_or(Decimal::ONE_HUNDRED);
    round_dp(ratio.min(Decimal::ONE_HUNDRED), 2)
}

impl From<work_order::Model> for WorkOrderView {
    fn from(order: work_order::Model) -> Self {
        let progress_percent = progress_percent(order.produced_quantity_kg, order.target_quantity_kg);
        Self {
            order,
            progress_percent,
        }
    }
}

#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl WorkOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &WorkOrderFilter,
        page: PageRequest,
    ) -> Result<Paged<WorkOrderView>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(work_order::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            condition = condition.add(work_order::Column::Priority.eq(priority));
        }
        if let Some(from) = filter.date_from {
            condition = condition.add(work_order::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            condition = condition.add(work_order::Column::DueDate.lte(to));
        }

        let query = WorkOrderEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_desc(work_order::Column::CreatedAt)
            .order_by_desc(work_order::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total }.map(WorkOrderView::from))
    }

    async fn find(&self, id: i32) -> Result<work_order::Model, ServiceError> {
        WorkOrderEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("work order", id))
    }

    pub async fn get(&self, id: i32) -> Result<WorkOrderView, ServiceError> {
        Ok(self.find(id).await?.into())
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

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: CreateWorkOrder) -> Result<WorkOrderView, ServiceError> {
        input.validate()?;
        ensure_positive("target_quantity_kg", input.target_quantity_kg)?;
        self.ensure_count_product(input.count_product_id).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let order_number = next_document_number::<WorkOrderEntity, _>(
            &txn,
            work_order::Column::OrderNumber,
            "WO",
            now.date_naive(),
        )
        .await?;

        let order = work_order::ActiveModel {
            order_number: Set(order_number),
            title: Set(input.title.trim().to_string()),
            count_product_id: Set(input.count_product_id),
            target_quantity_kg: Set(input.target_quantity_kg),
            produced_quantity_kg: Set(Decimal::ZERO),
            status: Set(WorkOrderStatus::Planned),
            priority: Set(input.priority),
            due_date: Set(input.due_date),
            assigned_to: Set(input.assigned_to),
            notes: Set(input.notes),
            started_at: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(id = order.id, order_number = %order.order_number, "Work order created");
        Ok(order.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: UpdateWorkOrder) -> Result<WorkOrderView, ServiceError> {
        input.validate()?;
        if let Some(target) = input.target_quantity_kg {
            ensure_positive("target_quantity_kg", target)?;
        }
        self.ensure_count_product(input.count_product_id).await?;

        let current = self.find(id).await?;
        if current.status.is_closed() {
            return Err(ServiceError::InvalidOperation(format!(
                "work order {} is {}",
                current.order_number,
                current.status
            )));
        }

        let mut active: work_order::ActiveModel = current.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(product) = input.count_product_id {
            active.count_product_id = Set(Some(product));
        }
        if let Some(target) = input.target_quantity_kg {
            active.target_quantity_kg = Set(target);
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority);
        }
        if let Some(due) = input.due_date {
            active.due_date = Set(Some(due));
        }
        if let Some(assignee) = input.assigned_to {
            active.assigned_to = Set(Some(assignee));
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?.into())
    }

    #[instrument(skip(self, input), fields(status = ?input.status))]
    pub async fn change_status(
        &self,
        id: i32,
        input: WorkOrderStatusUpdate,
    ) -> Result<WorkOrderView, ServiceError> {
        let current = self.find(id).await?;
        let previous = current.status;
        let next = input.status;
        if !previous.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move work order {} from {} to {}",
                current.order_number,
                previous,
                next
            )));
        }

        let now = Utc::now();
        let first_start = next == WorkOrderStatus::InProgress && current.started_at.is_none();
        let mut active: work_order::ActiveModel = current.into();
        active.status = Set(next);
        if first_start {
            active.started_at = Set(Some(now));
        }
        if next == WorkOrderStatus::Completed {
            active.completed_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        let updated = active.update(&*self.db).await?;

        info!(
            order_number = %updated.order_number,
            from = %previous,
            to = %next,
            reason = input.reason.as_deref().unwrap_or(""),
            "Work order status changed"
        );
        self.event_sender.emit(Event::WorkOrderStatusChanged {
            work_order_id: updated.id,
            order_number: updated.order_number.clone(),
            old_status: previous.to_string(),
            new_status: next.to_string(),
        });

        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let order = self.find(id).await?;
        if !matches!(order.status, WorkOrderStatus::Planned | WorkOrderStatus::Cancelled) {
            return Err(ServiceError::Conflict(format!(
                "work order {} is {}; only planned or cancelled orders can be deleted",
                order.order_number,
                order.status
            )));
        }
        WorkOrderEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "Work order deleted");
        Ok(())
    }
}
