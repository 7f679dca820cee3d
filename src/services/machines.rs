use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::{PageRequest, Paged};
use crate::{
    entities::{
        machine::{self, Entity as MachineEntity, MachineStatus},
        production_job::{self, Entity as ProductionJobEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMachine {
    #[validate(length(min = 1, max = 32))]
    pub machine_code: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub machine_type: String,
    pub department: Option<String>,
    #[serde(default = "default_status")]
    pub status: MachineStatus,
    #[validate(range(min = 0.0))]
    pub capacity_per_hour: Option<f64>,
    pub installed_on: Option<NaiveDate>,
}

fn default_status() -> MachineStatus {
    MachineStatus::Operational
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMachine {
    #[validate(length(min = 1, max = 32))]
    pub machine_code: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub machine_type: Option<String>,
    pub department: Option<String>,
    #[validate(range(min = 0.0))]
    pub capacity_per_hour: Option<f64>,
    pub installed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MachineStatusUpdate {
    pub status: MachineStatus,
}

#[derive(Debug, Clone, Default)]
pub struct MachineFilter {
    pub status: Option<MachineStatus>,
    pub machine_type: Option<String>,
    pub department: Option<String>,
}

#[derive(Clone)]
pub struct MachineService {
    db: Arc<DatabaseConnection>,
}

impl MachineService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &MachineFilter,
        page: PageRequest,
    ) -> Result<Paged<machine::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(machine::Column::Status.eq(status));
        }
        if let Some(kind) = &filter.machine_type {
            condition = condition.add(machine::Column::MachineType.eq(kind.as_str()));
        }
        if let Some(department) = &filter.department {
            condition = condition.add(machine::Column::Department.eq(department.as_str()));
        }

        let query = MachineEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(machine::Column::MachineCode)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;
        Ok(Paged { items, total })
    }

    pub async fn get(&self, id: i32) -> Result<machine::Model, ServiceError> {
        MachineEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("machine", id))
    }

    async fn ensure_code_free(&self, code: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = MachineEntity::find().filter(machine::Column::MachineCode.eq(code));
        if let Some(id) = except {
            query = query.filter(machine::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "machine code '{}' already exists",
                code
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(code = %input.machine_code))]
    pub async fn create(&self, input: CreateMachine) -> Result<machine::Model, ServiceError> {
        input.validate()?;
        let code = input.machine_code.trim().to_uppercase();
        self.ensure_code_free(&code, None).await?;

        let now = Utc::now();
        let machine = machine::ActiveModel {
            machine_code: Set(code),
            name: Set(input.name.trim().to_string()),
            machine_type: Set(input.machine_type.trim().to_string()),
            department: Set(input.department),
            status: Set(input.status),
            capacity_per_hour: Set(input.capacity_per_hour),
            installed_on: Set(input.installed_on),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(id = machine.id, "Machine created");
        Ok(machine)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: UpdateMachine) -> Result<machine::Model, ServiceError> {
        input.validate()?;
        let current = self.get(id).await?;
        let mut active: machine::ActiveModel = current.into();

        if let Some(code) = input.machine_code {
            let code = code.trim().to_uppercase();
            self.ensure_code_free(&code, Some(id)).await?;
            active.machine_code = Set(code);
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(kind) = input.machine_type {
            active.machine_type = Set(kind.trim().to_string());
        }
        if let Some(department) = input.department {
            active.department = Set(Some(department));
        }
        if let Some(capacity) = input.capacity_per_hour {
            active.capacity_per_hour = Set(Some(capacity));
        }
        if let Some(installed_on) = input.installed_on {
            active.installed_on = Set(Some(installed_on));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Retired machines are locked in that state
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: i32,
        status: MachineStatus,
    ) -> Result<machine::Model, ServiceError> {
        let current = self.get(id).await?;
        if current.status == MachineStatus::Retired && status != MachineStatus::Retired {
            return Err(ServiceError::InvalidStatus(format!(
                "machine {} is retired",
                current.machine_code
            )));
        }
        let previous = current.status;
        let mut active: machine::ActiveModel = current.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(
            code = %updated.machine_code,
            from = %previous,
            to = %status,
            "Machine status changed"
        );
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let machine = self.get(id).await?;
        let jobs = ProductionJobEntity::find()
            .filter(production_job::Column::MachineId.eq(id))
            .count(&*self.db)
            .await?;
        if jobs > 0 {
            return Err(ServiceError::Conflict(format!(
                "machine {} has {} production job(s)",
                machine.machine_code, jobs
            )));
        }
        MachineEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "Machine deleted");
        Ok(())
    }
}
