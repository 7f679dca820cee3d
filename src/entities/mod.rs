pub mod asu_machine;
pub mod bom_header;
pub mod bom_line;
pub mod count_product;
pub mod dyeing_firm;
pub mod dyeing_order;
pub mod inventory_item;
pub mod inventory_transaction;
pub mod machine;
pub mod machine_configuration;
pub mod production_entry;
pub mod production_job;
pub mod work_order;
