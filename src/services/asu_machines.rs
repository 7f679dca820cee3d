use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{PageRequest, Paged};
use crate::{
    entities::{
        asu_machine::{self, Entity as AsuMachineEntity},
        machine_configuration::{self, Entity as ConfigurationEntity},
        production_entry::{self, Entity as ProductionEntryEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAsuMachine {
    #[validate(range(min = 1, max = 2, message = "unit must be 1 or 2"))]
    pub unit: i32,
    #[validate(range(min = 1, message = "machine_no must be positive"))]
    pub machine_no: i32,
    #[validate(length(min = 1, max = 100))]
    pub machine_name: String,
    #[validate(length(min = 1, max = 32))]
    pub count: String,
    #[validate(length(min = 1, max = 64))]
    pub yarn_type: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub spindles: i32,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub speed: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub production_at_100: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAsuMachine {
    #[validate(range(min = 1, max = 2, message = "unit must be 1 or 2"))]
    pub unit: Option<i32>,
    #[validate(range(min = 1, message = "machine_no must be positive"))]
    pub machine_no: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub machine_name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub count: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub yarn_type: Option<String>,
    #[validate(range(min = 0))]
    pub spindles: Option<i32>,
    #[validate(range(min = 0.0))]
    pub speed: Option<f64>,
    #[validate(range(min = 0.0))]
    pub production_at_100: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateConfiguration {
    #[validate(length(min = 1, max = 32))]
    pub count: String,
    #[validate(length(min = 1, max = 64))]
    pub yarn_type: String,
    #[validate(range(min = 0))]
    pub spindles: i32,
    #[validate(range(min = 0.0))]
    pub speed: f64,
    #[validate(range(min = 0.0))]
    pub production_at_100: f64,
    pub effective_from: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AsuMachineFilter {
    pub unit: Option<i32>,
    pub active: Option<bool>,
}

/// ASU machines and their versioned configurations
#[derive(Clone)]
pub struct AsuMachineService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AsuMachineService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &AsuMachineFilter,
        page: PageRequest,
    ) -> Result<Paged<asu_machine::Model>, ServiceError> {
        let db = &*self.db;
        let mut condition = Condition::all();
        if let Some(unit) = filter.unit {
            condition = condition.add(asu_machine::Column::Unit.eq(unit));
        }
        if let Some(active) = filter.active {
            condition = condition.add(asu_machine::Column::IsActive.eq(active));
        }

        let query = AsuMachineEntity::find().filter(condition);
        let total = query.clone().count(db).await?;
        let items = query
            .order_by_asc(asu_machine::Column::Unit)
            .order_by_asc(asu_machine::Column::MachineNo)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;

        Ok(Paged { items, total })
    }

    pub async fn get(&self, id: i32) -> Result<asu_machine::Model, ServiceError> {
        AsuMachineEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("ASU machine", id))
    }

    /// Resolve a machine by its number within a unit
    pub async fn find_by_number(
        &self,
        unit: i32,
        machine_no: i32,
    ) -> Result<Option<asu_machine::Model>, ServiceError> {
        Ok(AsuMachineEntity::find()
            .filter(asu_machine::Column::Unit.eq(unit))
            .filter(asu_machine::Column::MachineNo.eq(machine_no))
            .one(&*self.db)
            .await?)
    }

    async fn ensure_number_free(
        &self,
        unit: i32,
        machine_no: i32,
        except_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        if let Some(existing) = self.find_by_number(unit, machine_no).await? {
            if Some(existing.id) != except_id {
                return Err(ServiceError::Conflict(format!(
                    "machine {} already exists in unit {}",
                    machine_no, unit
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(unit = input.unit, machine_no = input.machine_no))]
    pub async fn create(&self, input: CreateAsuMachine) -> Result<asu_machine::Model, ServiceError> {
        input.validate()?;
        self.ensure_number_free(input.unit, input.machine_no, None)
            .await?;

        let now = Utc::now();
        let machine = asu_machine::ActiveModel {
            unit: Set(input.unit),
            machine_no: Set(input.machine_no),
            machine_name: Set(input.machine_name.trim().to_string()),
            count: Set(input.count.trim().to_string()),
            yarn_type: Set(input.yarn_type.trim().to_string()),
            spindles: Set(input.spindles),
            speed: Set(input.speed),
            production_at_100: Set(input.production_at_100),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(id = machine.id, "ASU machine created");
        Ok(machine)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: UpdateAsuMachine,
    ) -> Result<asu_machine::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;

        let unit = input.unit.unwrap_or(existing.unit);
        let machine_no = input.machine_no.unwrap_or(existing.machine_no);
        if unit != existing.unit {
            // Entries carry the unit they were recorded under
            let entries = self.entry_count(id).await?;
            if entries > 0 {
                return Err(ServiceError::Conflict(format!(
                    "machine {} in unit {} has {} production entries; its unit cannot change",
                    existing.machine_no, existing.unit, entries
                )));
            }
        }
        if unit != existing.unit || machine_no != existing.machine_no {
            self.ensure_number_free(unit, machine_no, Some(id)).await?;
        }

        let mut active: asu_machine::ActiveModel = existing.into();
        active.unit = Set(unit);
        active.machine_no = Set(machine_no);
        if let Some(name) = input.machine_name {
            active.machine_name = Set(name.trim().to_string());
        }
        if let Some(count) = input.count {
            active.count = Set(count.trim().to_string());
        }
        if let Some(yarn_type) = input.yarn_type {
            active.yarn_type = Set(yarn_type.trim().to_string());
        }
        if let Some(spindles) = input.spindles {
            active.spindles = Set(spindles);
        }
        if let Some(speed) = input.speed {
            active.speed = Set(speed);
        }
        if let Some(p100) = input.production_at_100 {
            active.production_at_100 = Set(p100);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    async fn entry_count(&self, machine_id: i32) -> Result<u64, ServiceError> {
        Ok(ProductionEntryEntity::find()
            .filter(production_entry::Column::MachineId.eq(machine_id))
            .count(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let machine = self.get(id).await?;

        let entries = self.entry_count(id).await?;
        if entries > 0 {
            return Err(ServiceError::Conflict(format!(
                "machine {} in unit {} has {} production entries; deactivate instead",
                machine.machine_no, machine.unit, entries
            )));
        }

        AsuMachineEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(id, "ASU machine deleted");
        Ok(())
    }

    /// Configuration history, newest version first
    pub async fn list_configurations(
        &self,
        machine_id: i32,
    ) -> Result<Vec<machine_configuration::Model>, ServiceError> {
        self.get(machine_id).await?;
        Ok(ConfigurationEntity::find()
            .filter(machine_configuration::Column::MachineId.eq(machine_id))
            .order_by_desc(machine_configuration::Column::Version)
            .all(&*self.db)
            .await?)
    }

    /// Configuration in force on `date`, if any
    pub async fn configuration_on(
        &self,
        machine_id: i32,
        date: NaiveDate,
    ) -> Result<Option<machine_configuration::Model>, ServiceError> {
        Ok(ConfigurationEntity::find()
            .filter(machine_configuration::Column::MachineId.eq(machine_id))
            .filter(machine_configuration::Column::EffectiveFrom.lte(date))
            .filter(
                Condition::any()
                    .add(machine_configuration::Column::EffectiveTo.is_null())
                    .add(machine_configuration::Column::EffectiveTo.gt(date)),
            )
            .order_by_desc(machine_configuration::Column::Version)
            .one(&*self.db)
            .await?)
    }

    /// Close the open version, append the next one and mirror its settings
    /// onto the machine row, all in one transaction.
    #[instrument(skip(self, input), fields(effective_from = %input.effective_from))]
    pub async fn add_configuration(
        &self,
        machine_id: i32,
        input: CreateConfiguration,
        created_by: Option<Uuid>,
    ) -> Result<machine_configuration::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;

        let machine = AsuMachineEntity::find_by_id(machine_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("ASU machine", machine_id))?;

        let latest = ConfigurationEntity::find()
            .filter(machine_configuration::Column::MachineId.eq(machine_id))
            .order_by_desc(machine_configuration::Column::Version)
            .one(&txn)
            .await?;

        let next_version = latest.as_ref().map_or(1, |c| c.version + 1);

        if let Some(open) = ConfigurationEntity::find()
            .filter(machine_configuration::Column::MachineId.eq(machine_id))
            .filter(machine_configuration::Column::EffectiveTo.is_null())
            .one(&txn)
            .await?
        {
            if input.effective_from < open.effective_from {
                return Err(ServiceError::ValidationError(format!(
                    "effective_from {} precedes the current version's start {}",
                    input.effective_from, open.effective_from
                )));
            }
            let mut closing: machine_configuration::ActiveModel = open.into();
            closing.effective_to = Set(Some(input.effective_from));
            closing.update(&txn).await?;
        }

        let created = machine_configuration::ActiveModel {
            machine_id: Set(machine_id),
            version: Set(next_version),
            count: Set(input.count.trim().to_string()),
            yarn_type: Set(input.yarn_type.trim().to_string()),
            spindles: Set(input.spindles),
            speed: Set(input.speed),
            production_at_100: Set(input.production_at_100),
            effective_from: Set(input.effective_from),
            effective_to: Set(None),
            notes: Set(input.notes),
            created_by: Set(created_by),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut mirrored: asu_machine::ActiveModel = machine.into();
        mirrored.count = Set(created.count.clone());
        mirrored.yarn_type = Set(created.yarn_type.clone());
        mirrored.spindles = Set(created.spindles);
        mirrored.speed = Set(created.speed);
        mirrored.production_at_100 = Set(created.production_at_100);
        mirrored.updated_at = Set(Utc::now());
        mirrored.update(&txn).await?;

        txn.commit().await?;

        info!(machine_id, version = created.version, "Machine configuration added");
        self.event_sender.emit(Event::MachineConfigurationChanged {
            machine_id,
            version: created.version,
            effective_from: created.effective_from,
        });

        Ok(created)
    }
}
