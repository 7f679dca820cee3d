use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::{inventory_item, inventory_item::ItemCategory, inventory_transaction},
    errors::ServiceError,
    services::inventory::{
        AdjustmentResult, CreateInventoryItem, InventoryFilter, StockAdjustment,
        UpdateInventoryItem,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    pub category: Option<ItemCategory>,
    /// Substring of sku or name
    pub search: Option<String>,
    /// Only items at or below their reorder level
    pub low_stock: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LedgerQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryQuery),
    responses((status = 200, description = "Paginated items", body = [inventory_item::Model])),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<PaginatedResponse<inventory_item::Model>> {
    let filter = InventoryFilter {
        category: query.category,
        search: query.search,
        low_stock: query.low_stock,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let items = state.services.inventory.list(&filter, page).await?;
    Ok(success_response(paginated(items, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses((status = 200, description = "Items at or below reorder level", body = [inventory_item::Model])),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Vec<inventory_item::Model>> {
    Ok(success_response(state.services.inventory.low_stock().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = i32, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item", body = inventory_item::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<inventory_item::Model> {
    Ok(success_response(state.services.inventory.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryItem,
    responses(
        (status = 201, description = "Item created", body = inventory_item::Model),
        (status = 409, description = "SKU taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateInventoryItem>,
) -> Result<(StatusCode, Json<ApiResponse<inventory_item::Model>>), ServiceError> {
    let item = state
        .services
        .inventory
        .create(payload, Some(user.user_id))
        .await?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = i32, Path, description = "Item id")),
    request_body = UpdateInventoryItem,
    responses(
        (status = 200, description = "Item updated", body = inventory_item::Model),
        (status = 409, description = "SKU taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInventoryItem>,
) -> ApiResult<inventory_item::Model> {
    Ok(success_response(
        state.services.inventory.update(id, payload).await?,
    ))
}

/// Receive, issue or set stock, writing a ledger row
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust",
    params(("id" = i32, Path, description = "Item id")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Adjusted item and ledger row", body = AdjustmentResult),
        (status = 422, description = "Issue exceeds stock on hand", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn adjust_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<StockAdjustment>,
) -> ApiResult<AdjustmentResult> {
    let result = state
        .services
        .inventory
        .adjust(id, payload, Some(user.user_id))
        .await?;
    Ok(success_response(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/transactions",
    params(("id" = i32, Path, description = "Item id"), LedgerQuery),
    responses((status = 200, description = "Ledger rows, newest first", body = [inventory_transaction::Model])),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<PaginatedResponse<inventory_transaction::Model>> {
    let page = page_request(query.page, query.limit, &state.config);
    let rows = state.services.inventory.transactions(id, page).await?;
    Ok(success_response(paginated(rows, page)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = i32, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 409, description = "Referenced by a BOM line", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.inventory.delete(id).await?;
    Ok(message_response("Inventory item deleted"))
}
