use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Textile ERP API",
        version = "1.0.0",
        description = r#"
# Textile ERP API

Backend for a spinning and dyeing plant.

## Features

- **ASU Machines**: machines per unit with versioned configurations
- **Production**: per-shift entries, daily reconciliation and summaries
- **Dyeing**: firms, orders, status flow and receipts
- **Inventory**: items, stock adjustments and the ledger
- **Work Orders**: plant machines, work orders and production jobs
- **BOM & Costing**: material requirements and yarn cost build-up

## Authentication

Every `/api/v1` endpoint except `/api/v1/status` requires a JWT access token:

```
Authorization: Bearer <your-jwt-token>
```

Users bound to an ASU unit only see and write that unit's data.

## Error Handling

```json
{
  "success": false,
  "error": "ASU machine 7 not found",
  "code": "Not Found",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
Date filters are `dateFrom` / `dateTo`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, token refresh and the current user"),
        (name = "asu-machines", description = "ASU machines and configuration history"),
        (name = "production", description = "Shift production entries"),
        (name = "count-products", description = "Yarn count catalogue"),
        (name = "dyeing", description = "Dyeing firms and orders"),
        (name = "inventory", description = "Stock items and ledger"),
        (name = "machines", description = "Plant machines"),
        (name = "work-orders", description = "Work orders"),
        (name = "production-jobs", description = "Jobs run on plant machines"),
        (name = "boms", description = "Bills of material"),
        (name = "costing", description = "Yarn cost calculator"),
        (name = "users", description = "Account administration")
    ),
    paths(
        // Auth
        crate::auth::login_handler,
        crate::auth::refresh_token_handler,
        crate::auth::logout_handler,
        crate::auth::me_handler,
        crate::auth::change_password_handler,

        // ASU machines
        crate::handlers::asu_machines::list_machines,
        crate::handlers::asu_machines::get_machine,
        crate::handlers::asu_machines::create_machine,
        crate::handlers::asu_machines::update_machine,
        crate::handlers::asu_machines::delete_machine,
        crate::handlers::asu_machines::list_configurations,
        crate::handlers::asu_machines::add_configuration,

        // Production entries
        crate::handlers::production_entries::list_entries,
        crate::handlers::production_entries::daily_entries,
        crate::handlers::production_entries::entries_summary,
        crate::handlers::production_entries::get_entry,
        crate::handlers::production_entries::create_entry,
        crate::handlers::production_entries::update_entry,
        crate::handlers::production_entries::delete_entry,

        // Count products
        crate::handlers::count_products::list_count_products,
        crate::handlers::count_products::get_count_product,
        crate::handlers::count_products::create_count_product,
        crate::handlers::count_products::update_count_product,
        crate::handlers::count_products::delete_count_product,

        // Dyeing
        crate::handlers::dyeing::list_firms,
        crate::handlers::dyeing::get_firm,
        crate::handlers::dyeing::create_firm,
        crate::handlers::dyeing::update_firm,
        crate::handlers::dyeing::delete_firm,
        crate::handlers::dyeing::list_orders,
        crate::handlers::dyeing::get_order,
        crate::handlers::dyeing::create_order,
        crate::handlers::dyeing::update_order,
        crate::handlers::dyeing::change_order_status,
        crate::handlers::dyeing::record_receipt,
        crate::handlers::dyeing::delete_order,

        // Inventory
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::low_stock,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::adjust_item,
        crate::handlers::inventory::list_transactions,
        crate::handlers::inventory::delete_item,

        // Plant machines
        crate::handlers::machines::list_machines,
        crate::handlers::machines::get_machine,
        crate::handlers::machines::create_machine,
        crate::handlers::machines::update_machine,
        crate::handlers::machines::change_machine_status,
        crate::handlers::machines::delete_machine,

        // Work orders
        crate::handlers::work_orders::list_work_orders,
        crate::handlers::work_orders::get_work_order,
        crate::handlers::work_orders::create_work_order,
        crate::handlers::work_orders::update_work_order,
        crate::handlers::work_orders::change_work_order_status,
        crate::handlers::work_orders::delete_work_order,

        // Production jobs
        crate::handlers::production_jobs::list_jobs,
        crate::handlers::production_jobs::get_job,
        crate::handlers::production_jobs::create_job,
        crate::handlers::production_jobs::change_job_status,
        crate::handlers::production_jobs::record_output,
        crate::handlers::production_jobs::delete_job,

        // BOM
        crate::handlers::bom::list_boms,
        crate::handlers::bom::get_bom,
        crate::handlers::bom::create_bom,
        crate::handlers::bom::update_bom,
        crate::handlers::bom::add_line,
        crate::handlers::bom::remove_line,
        crate::handlers::bom::delete_bom,
        crate::handlers::bom::requirements,
        crate::handlers::bom::cost,

        // Costing
        crate::handlers::costing::yarn_cost,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::reset_password,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::errors::ErrorResponse,
            crate::entities::production_entry::Shift,
            crate::entities::dyeing_order::DyeingStatus,
            crate::entities::inventory_item::ItemCategory,
            crate::entities::inventory_transaction::TransactionKind,
            crate::entities::machine::MachineStatus,
            crate::entities::work_order::WorkOrderStatus,
            crate::entities::work_order::WorkOrderPriority,
            crate::entities::production_job::JobStatus,
            crate::auth::user::UserRole,
            crate::services::production_entries::ShiftInput,
            crate::services::inventory::AdjustmentKind,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Textile ERP API"));
        assert!(json.contains("/api/v1/asu/production-entries/daily"));
        assert!(json.contains("/api/v1/costing/yarn"));
        assert!(json.contains("bearer_auth"));
    }
}
