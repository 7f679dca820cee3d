use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{checked, ensure_positive, next_document_number, round_dp, PageRequest, Paged};
use crate::{
    entities::{
        machine::{Entity as MachineEntity, MachineStatus},
        production_job::{self, Entity as ProductionJobEntity, JobStatus},
        work_order::{self, Entity as WorkOrderEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductionJob {
    pub machine_id: i32,
    pub work_order_id: Option<i32>,
    #[schema(value_type = f64)]
    pub planned_quantity_kg: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JobStatusUpdate {
    pub status: JobStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JobOutput {
    #[schema(value_type = f64)]
    pub quantity_kg: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ProductionJobFilter {
    pub status: Option<JobStatus>,
    pub machine_id: Option<i32>,
    pub work_order_id: Option<i32>,
}

fn add_output(current: Decimal, quantity: Decimal) -> Result<Decimal, ServiceError> {
    let total = round_dp(checked(current.checked_add(quantity), "produced quantity")?, 3);
    ensure_positive("produced quantity", total)?;
    Ok(total)
}

/// Jobs scheduled on plant machines, optionally against a work order
#[derive(Clone)]
pub struct ProductionJobService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ProductionJobService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductionJobFilter,
        page: PageRequest,
    ) -> Result<Paged<production_job::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(production_job::Column::Status.eq(status));
        }
        if let Some(machine_id) = filter.machine_id {
            condition = condition.add(production_job::Column::MachineId.eq(machine_id));
        }
        if let Some(work_order_id) = filter.work_order_id {
            condition = condition.add(production_job::Column::WorkOrderId.eq(work_order_id));
        }

        let query = ProductionJobEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_desc(production_job::Column::CreatedAt)
            .order_by_desc(production_job::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    pub async fn get(&self, id: i32) -> Result<production_job::Model, ServiceError> {
        ProductionJobEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("production job", id))
    }

    #[instrument(skip(self, input), fields(machine_id = input.machine_id))]
    pub async fn create(
        &self,
        input: CreateProductionJob,
    ) -> Result<production_job::Model, ServiceError> {
        ensure_positive("planned_quantity_kg", input.planned_quantity_kg)?;

        let machine = MachineEntity::find_by_id(input.machine_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("machine", input.machine_id))?;
        if machine.status == MachineStatus::Retired {
            return Err(ServiceError::ValidationError(format!(
                "machine {} is retired",
                machine.machine_code
            )));
        }

        if let Some(work_order_id) = input.work_order_id {
            let order = WorkOrderEntity::find_by_id(work_order_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::not_found("work order", work_order_id))?;
            if order.status.is_closed() {
                return Err(ServiceError::ValidationError(format!(
                    "work order {} is {}",
                    order.order_number,
                    order.status
                )));
            }
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let job_number = next_document_number::<ProductionJobEntity, _>(
            &txn,
            production_job::Column::JobNumber,
            "JOB",
            now.date_naive(),
        )
        .await?;

        let job = production_job::ActiveModel {
            job_number: Set(job_number),
            machine_id: Set(input.machine_id),
            work_order_id: Set(input.work_order_id),
            planned_quantity_kg: Set(input.planned_quantity_kg),
            produced_quantity_kg: Set(Decimal::ZERO),
            status: Set(JobStatus::Queued),
            started_at: Set(None),
            finished_at: Set(None),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(id = job.id, job_number = %job.job_number, "Production job created");
        Ok(job)
    }

    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: i32,
        next: JobStatus,
    ) -> Result<production_job::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let job = ProductionJobEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("production job", id))?;

        let previous = job.status;
        if !previous.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move job {} from {} to {}",
                job.job_number,
                previous,
                next
            )));
        }

        if next == JobStatus::Running {
            // Starts on one machine queue behind this lock; the partial unique
            // index on running jobs backs it up
            let machine = MachineEntity::find_by_id(job.machine_id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("machine", job.machine_id))?;
            if machine.status != MachineStatus::Operational {
                return Err(ServiceError::InvalidOperation(format!(
                    "machine {} is {}",
                    machine.machine_code,
                    machine.status
                )));
            }

            let running = ProductionJobEntity::find()
                .filter(production_job::Column::MachineId.eq(job.machine_id))
                .filter(production_job::Column::Status.eq(JobStatus::Running))
                .filter(production_job::Column::Id.ne(job.id))
                .count(&txn)
                .await?;
            if running > 0 {
                return Err(ServiceError::Conflict(format!(
                    "machine {} already has a running job",
                    machine.machine_code
                )));
            }
        }

        let now = Utc::now();
        let first_start = next == JobStatus::Running && job.started_at.is_none();
        let mut active: production_job::ActiveModel = job.into();
        active.status = Set(next);
        if first_start {
            active.started_at = Set(Some(now));
        }
        if next == JobStatus::Done {
            active.finished_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            job_number = %updated.job_number,
            from = %previous,
            to = %next,
            "Production job status changed"
        );
        self.event_sender.emit(Event::ProductionJobStatusChanged {
            job_id: updated.id,
            job_number: updated.job_number.clone(),
            old_status: previous.to_string(),
            new_status: next.to_string(),
            at: now,
        });

        Ok(updated)
    }

    /// Book output on a running job and roll it up to the work order
    #[instrument(skip(self, input), fields(quantity_kg = %input.quantity_kg))]
    pub async fn record_output(
        &self,
        id: i32,
        input: JobOutput,
    ) -> Result<production_job::Model, ServiceError> {
        ensure_positive("quantity_kg", input.quantity_kg)?;

        let txn = self.db.begin().await?;
        let job = ProductionJobEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("production job", id))?;
        if job.status != JobStatus::Running {
            return Err(ServiceError::InvalidStatus(format!(
                "job {} is {}; output can only be booked on running jobs",
                job.job_number,
                job.status
            )));
        }

        let now = Utc::now();
        let work_order_id = job.work_order_id;
        let produced = add_output(job.produced_quantity_kg, input.quantity_kg)?;
        let mut active: production_job::ActiveModel = job.into();
        active.produced_quantity_kg = Set(produced);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        if let Some(order_id) = work_order_id {
            let order = WorkOrderEntity::find_by_id(order_id)
                .lock_exclusive()
                .one(&txn)
                .await?;
            if let Some(order) = order {
                let total = add_output(order.produced_quantity_kg, input.quantity_kg)?;
                let mut order: work_order::ActiveModel = order.into();
                order.produced_quantity_kg = Set(total);
                order.updated_at = Set(now);
                order.update(&txn).await?;
            }
        }
        txn.commit().await?;

        info!(job_number = %updated.job_number, %produced, "Job output recorded");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let job = self.get(id).await?;
        if !matches!(job.status, JobStatus::Queued | JobStatus::Cancelled) {
            return Err(ServiceError::Conflict(format!(
                "job {} is {}; only queued or cancelled jobs can be deleted",
                job.job_number,
                job.status
            )));
        }
        ProductionJobEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "Production job deleted");
        Ok(())
    }
}
