pub mod asu_machines;
pub mod bom;
pub mod common;
pub mod costing;
pub mod count_products;
pub mod dyeing;
pub mod inventory;
pub mod machines;
pub mod production_entries;
pub mod production_jobs;
pub mod users;
pub mod work_orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    asu_machines::AsuMachineService, bom::BomService, count_products::CountProductService,
    dyeing::DyeingService, inventory::InventoryService, machines::MachineService,
    production_entries::ProductionEntryService, production_jobs::ProductionJobService,
    users::UserService, work_orders::WorkOrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub asu_machines: Arc<AsuMachineService>,
    pub production_entries: Arc<ProductionEntryService>,
    pub count_products: Arc<CountProductService>,
    pub dyeing: Arc<DyeingService>,
    pub inventory: Arc<InventoryService>,
    pub machines: Arc<MachineService>,
    pub work_orders: Arc<WorkOrderService>,
    pub production_jobs: Arc<ProductionJobService>,
    pub boms: Arc<BomService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, config: &AppConfig) -> Self {
        let asu_machines = AsuMachineService::new(db.clone(), event_sender.clone());
        let production_entries = ProductionEntryService::new(
            db.clone(),
            event_sender.clone(),
            asu_machines.clone(),
            config.low_efficiency_threshold,
        );

        Self {
            asu_machines: Arc::new(asu_machines),
            production_entries: Arc::new(production_entries),
            count_products: Arc::new(CountProductService::new(db.clone())),
            dyeing: Arc::new(DyeingService::new(db.clone(), event_sender.clone())),
            inventory: Arc::new(InventoryService::new(db.clone(), event_sender.clone())),
            machines: Arc::new(MachineService::new(db.clone())),
            work_orders: Arc::new(WorkOrderService::new(db.clone(), event_sender.clone())),
            production_jobs: Arc::new(ProductionJobService::new(db.clone(), event_sender)),
            boms: Arc::new(BomService::new(db.clone())),
            users: Arc::new(UserService::new(db)),
        }
    }
}
