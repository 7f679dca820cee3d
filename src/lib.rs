//! Textile ERP API Library
//!
//! Production backend for a yarn spinning and dyeing plant: ASU machines and
//! their shift output, dyeing, inventory, work orders, BOMs and costing.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, Extension, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::{sync::Arc, time::Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            services,
            started_at: Instant::now(),
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` route; each group carries the permission it needs.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{
        asu_machines, bom, costing, count_products, dyeing, inventory, machines,
        production_entries, production_jobs, users, work_orders,
    };

    // ASU machines and plant machines
    let machines_read = Router::new()
        .route("/asu/machines", get(asu_machines::list_machines))
        .route("/asu/machines/:id", get(asu_machines::get_machine))
        .route(
            "/asu/machines/:id/configurations",
            get(asu_machines::list_configurations),
        )
        .route("/machines", get(machines::list_machines))
        .route("/machines/:id", get(machines::get_machine))
        .with_permission(perm::MACHINES_READ);

    let machines_write = Router::new()
        .route("/asu/machines", post(asu_machines::create_machine))
        .route(
            "/asu/machines/:id",
            put(asu_machines::update_machine).delete(asu_machines::delete_machine),
        )
        .route(
            "/asu/machines/:id/configurations",
            post(asu_machines::add_configuration),
        )
        .route("/machines", post(machines::create_machine))
        .route(
            "/machines/:id",
            put(machines::update_machine).delete(machines::delete_machine),
        )
        .route("/machines/:id/status", put(machines::change_machine_status))
        .with_permission(perm::MACHINES_WRITE);

    // Production entries and count products
    let production_read = Router::new()
        .route(
            "/asu/production-entries",
            get(production_entries::list_entries),
        )
        .route(
            "/asu/production-entries/daily",
            get(production_entries::daily_entries),
        )
        .route(
            "/asu/production-entries/summary",
            get(production_entries::entries_summary),
        )
        .route(
            "/asu/production-entries/:id",
            get(production_entries::get_entry),
        )
        .route("/count-products", get(count_products::list_count_products))
        .route("/count-products/:id", get(count_products::get_count_product))
        .with_permission(perm::PRODUCTION_READ);

    let production_write = Router::new()
        .route(
            "/asu/production-entries",
            post(production_entries::create_entry),
        )
        .route(
            "/asu/production-entries/:id",
            put(production_entries::update_entry).delete(production_entries::delete_entry),
        )
        .route("/count-products", post(count_products::create_count_product))
        .route(
            "/count-products/:id",
            put(count_products::update_count_product)
                .delete(count_products::delete_count_product),
        )
        .with_permission(perm::PRODUCTION_WRITE);

    // Dyeing
    let dyeing_read = Router::new()
        .route("/dyeing/firms", get(dyeing::list_firms))
        .route("/dyeing/firms/:id", get(dyeing::get_firm))
        .route("/dyeing/orders", get(dyeing::list_orders))
        .route("/dyeing/orders/:id", get(dyeing::get_order))
        .with_permission(perm::DYEING_READ);

    let dyeing_write = Router::new()
        .route("/dyeing/firms", post(dyeing::create_firm))
        .route(
            "/dyeing/firms/:id",
            put(dyeing::update_firm).delete(dyeing::delete_firm),
        )
        .route("/dyeing/orders", post(dyeing::create_order))
        .route(
            "/dyeing/orders/:id",
            put(dyeing::update_order).delete(dyeing::delete_order),
        )
        .route("/dyeing/orders/:id/status", put(dyeing::change_order_status))
        .route("/dyeing/orders/:id/receipts", post(dyeing::record_receipt))
        .with_permission(perm::DYEING_WRITE);

    // Inventory
    let inventory_read = Router::new()
        .route("/inventory", get(inventory::list_items))
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route("/inventory/:id", get(inventory::get_item))
        .route(
            "/inventory/:id/transactions",
            get(inventory::list_transactions),
        )
        .with_permission(perm::INVENTORY_READ);

    let inventory_mutate = Router::new()
        .route("/inventory", post(inventory::create_item))
        .route(
            "/inventory/:id",
            put(inventory::update_item).delete(inventory::delete_item),
        )
        .route("/inventory/:id/adjust", post(inventory::adjust_item))
        .with_permission(perm::INVENTORY_ADJUST);

    // Work orders and production jobs
    let work_orders_read = Router::new()
        .route("/work-orders", get(work_orders::list_work_orders))
        .route("/work-orders/:id", get(work_orders::get_work_order))
        .route("/production-jobs", get(production_jobs::list_jobs))
        .route("/production-jobs/:id", get(production_jobs::get_job))
        .with_permission(perm::WORKORDERS_READ);

    let work_orders_write = Router::new()
        .route("/work-orders", post(work_orders::create_work_order))
        .route(
            "/work-orders/:id",
            put(work_orders::update_work_order).delete(work_orders::delete_work_order),
        )
        .route(
            "/work-orders/:id/status",
            put(work_orders::change_work_order_status),
        )
        .route("/production-jobs", post(production_jobs::create_job))
        .route("/production-jobs/:id", delete(production_jobs::delete_job))
        .route(
            "/production-jobs/:id/status",
            put(production_jobs::change_job_status),
        )
        .route(
            "/production-jobs/:id/output",
            post(production_jobs::record_output),
        )
        .with_permission(perm::WORKORDERS_WRITE);

    // Bill of materials
    let boms_read = Router::new()
        .route("/boms", get(bom::list_boms))
        .route("/boms/:id", get(bom::get_bom))
        .route("/boms/:id/requirements", get(bom::requirements))
        .with_permission(perm::BOMS_READ);

    let boms_manage = Router::new()
        .route("/boms", post(bom::create_bom))
        .route("/boms/:id", put(bom::update_bom).delete(bom::delete_bom))
        .route("/boms/:id/lines", post(bom::add_line))
        .route("/boms/:id/lines/:line_id", delete(bom::remove_line))
        .with_permission(perm::BOMS_MANAGE);

    // Costing
    let costing = Router::new()
        .route("/boms/:id/cost", get(bom::cost))
        .route("/costing/yarn", post(costing::yarn_cost))
        .with_permission(perm::COSTING_READ);

    // User administration
    let user_admin = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/reset-password", post(users::reset_password))
        .with_permission(perm::USERS_MANAGE);

    Router::new()
        .route("/status", get(api_status))
        .merge(machines_read)
        .merge(machines_write)
        .merge(production_read)
        .merge(production_write)
        .merge(dyeing_read)
        .merge(dyeing_write)
        .merge(inventory_read)
        .merge(inventory_mutate)
        .merge(work_orders_read)
        .merge(work_orders_write)
        .merge(boms_read)
        .merge(boms_manage)
        .merge(costing)
        .merge(user_admin)
}

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
    })))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match state.db.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "Database ping failed");
            "unhealthy"
        }
    };
    let status = if db_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });
    (status, Json(ApiResponse::success(body)))
}

async fn metrics_endpoint() -> impl IntoResponse {
    match metrics::metrics_handler().await {
        Ok(body) => (StatusCode::OK, body),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("metrics error"),
        ),
    }
}

/// CORS policy from config: explicit origins, or permissive when allowed.
pub fn cors_layer(cfg: &config::AppConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_credentials(cfg.cors_allow_credentials),
        )
    } else if cfg.should_allow_permissive_cors() {
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

/// Full application router: `/api/v1`, `/auth`, health, metrics and docs.
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config);

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", auth::auth_routes().with_state(auth_service.clone()))
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(
            middleware_helpers::http_metrics::http_metrics_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(DefaultBodyLimit::max(max_body_size))
        // AuthService in request extensions for the auth middleware
        .layer(Extension(auth_service))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state);

    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    app
}
