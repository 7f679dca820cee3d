use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::entities::production_entry::Shift;

/// Handle for publishing domain events to the background consumer.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Publishes an event without waiting. A full or closed channel is
    /// logged and the event dropped; the caller never fails because of it.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            let name = match &e {
                mpsc::error::TrySendError::Full(ev) | mpsc::error::TrySendError::Closed(ev) => {
                    ev.name()
                }
            };
            warn!(event = name, error = %e, "Dropping domain event");
            crate::metrics::increment_counter("events_dropped_total");
        }
    }
}

/// Domain events raised by the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductionEntryRecorded {
        entry_id: i32,
        unit: i32,
        machine_number: i32,
        date: NaiveDate,
        shift: Shift,
        percentage: f64,
    },
    /// An existing entry was corrected; carries the recomputed percentage
    ProductionEntryUpdated {
        entry_id: i32,
        unit: i32,
        machine_number: i32,
        date: NaiveDate,
        shift: Shift,
        percentage: f64,
    },
    LowEfficiency {
        entry_id: i32,
        unit: i32,
        machine_number: i32,
        date: NaiveDate,
        shift: Shift,
        percentage: f64,
        threshold: f64,
    },
    MachineConfigurationChanged {
        machine_id: i32,
        version: i32,
        effective_from: NaiveDate,
    },
    InventoryAdjusted {
        item_id: i32,
        sku: String,
        kind: String,
        #[serde(with = "rust_decimal::serde::float")]
        quantity_change: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        balance_after: Decimal,
    },
    LowStock {
        item_id: i32,
        sku: String,
        #[serde(with = "rust_decimal::serde::float")]
        quantity: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        reorder_level: Decimal,
    },
    DyeingOrderStatusChanged {
        order_id: i32,
        order_number: String,
        old_status: String,
        new_status: String,
    },
    WorkOrderStatusChanged {
        work_order_id: i32,
        order_number: String,
        old_status: String,
        new_status: String,
    },
    ProductionJobStatusChanged {
        job_id: i32,
        job_number: String,
        old_status: String,
        new_status: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProductionEntryRecorded { .. } => "production_entry_recorded",
            Event::ProductionEntryUpdated { .. } => "production_entry_updated",
            Event::LowEfficiency { .. } => "low_efficiency",
            Event::MachineConfigurationChanged { .. } => "machine_configuration_changed",
            Event::InventoryAdjusted { .. } => "inventory_adjusted",
            Event::LowStock { .. } => "low_stock",
            Event::DyeingOrderStatusChanged { .. } => "dyeing_order_status_changed",
            Event::WorkOrderStatusChanged { .. } => "work_order_status_changed",
            Event::ProductionJobStatusChanged { .. } => "production_job_status_changed",
        }
    }
}

/// Build a sender/receiver pair with the given capacity
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

// Consumes events until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        crate::metrics::increment_counter(&format!("events_{}_total", event.name()));
        handle_event(&event);
    }

    warn!("Event processing loop has ended");
}

fn handle_event(event: &Event) {
    match event {
        Event::ProductionEntryRecorded {
            entry_id,
            unit,
            machine_number,
            date,
            shift,
            percentage,
        } => {
            debug!(
                entry_id,
                unit,
                machine_number,
                %date,
                shift = shift.as_str(),
                percentage,
                "Production entry recorded"
            );
        }
        Event::ProductionEntryUpdated {
            entry_id,
            unit,
            machine_number,
            date,
            shift,
            percentage,
        } => {
            info!(
                entry_id,
                unit,
                machine_number,
                %date,
                shift = shift.as_str(),
                percentage,
                "Production entry corrected"
            );
        }
        Event::LowEfficiency {
            entry_id,
            unit,
            machine_number,
            date,
            shift,
            percentage,
            threshold,
        } => {
            warn!(
                entry_id,
                unit,
                machine_number,
                %date,
                shift = shift.as_str(),
                percentage,
                threshold,
                "Machine ran below the efficiency threshold"
            );
        }
        Event::MachineConfigurationChanged {
            machine_id,
            version,
            effective_from,
        } => {
            info!(machine_id, version, %effective_from, "Machine configuration changed");
        }
        Event::InventoryAdjusted {
            item_id,
            sku,
            kind,
            quantity_change,
            balance_after,
        } => {
            info!(
                item_id,
                %sku,
                %kind,
                %quantity_change,
                %balance_after,
                "Inventory adjusted"
            );
        }
        Event::LowStock {
            item_id,
            sku,
            quantity,
            reorder_level,
        } => {
            warn!(item_id, %sku, %quantity, %reorder_level, "Item at or below reorder level");
        }
        Event::DyeingOrderStatusChanged {
            order_id,
            order_number,
            old_status,
            new_status,
        } => {
            info!(order_id, %order_number, %old_status, %new_status, "Dyeing order status changed");
        }
        Event::WorkOrderStatusChanged {
            work_order_id,
            order_number,
            old_status,
            new_status,
        } => {
            info!(work_order_id, %order_number, %old_status, %new_status, "Work order status changed");
        }
        Event::ProductionJobStatusChanged {
            job_id,
            job_number,
            old_status,
            new_status,
            at,
        } => {
            if new_status == "cancelled" {
                warn!(job_id, %job_number, %old_status, "Production job cancelled");
            } else {
                info!(job_id, %job_number, %old_status, %new_status, %at, "Production job status changed");
            }
        }
    }
}
