use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::{dyeing_firm, dyeing_order::DyeingStatus},
    errors::ServiceError,
    services::dyeing::{
        CreateDyeingFirm, CreateDyeingOrder, DyeingFirmFilter, DyeingOrderFilter, DyeingOrderView,
        DyeingReceipt, DyeingStatusUpdate, UpdateDyeingFirm, UpdateDyeingOrder,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DyeingFirmQuery {
    pub active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DyeingOrderQuery {
    pub firm_id: Option<i32>,
    pub status: Option<DyeingStatus>,
    /// Lower bound on the order's created date
    #[serde(rename = "dateFrom", alias = "date_from")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "dateTo", alias = "date_to")]
    pub date_to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// Firms

#[utoipa::path(
    get,
    path = "/api/v1/dyeing/firms",
    params(DyeingFirmQuery),
    responses((status = 200, description = "Paginated firms", body = [dyeing_firm::Model])),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn list_firms(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<DyeingFirmQuery>,
) -> ApiResult<PaginatedResponse<dyeing_firm::Model>> {
    let filter = DyeingFirmFilter {
        active: query.active,
        search: query.search,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let firms = state.services.dyeing.list_firms(&filter, page).await?;
    Ok(success_response(paginated(firms, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dyeing/firms/{id}",
    params(("id" = i32, Path, description = "Firm id")),
    responses(
        (status = 200, description = "Firm", body = dyeing_firm::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn get_firm(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<dyeing_firm::Model> {
    Ok(success_response(state.services.dyeing.get_firm(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/dyeing/firms",
    request_body = CreateDyeingFirm,
    responses(
        (status = 201, description = "Firm created", body = dyeing_firm::Model),
        (status = 409, description = "Name taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn create_firm(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateDyeingFirm>,
) -> Result<(StatusCode, Json<ApiResponse<dyeing_firm::Model>>), ServiceError> {
    let firm = state.services.dyeing.create_firm(payload).await?;
    Ok(created_response(firm))
}

#[utoipa::path(
    put,
    path = "/api/v1/dyeing/firms/{id}",
    params(("id" = i32, Path, description = "Firm id")),
    request_body = UpdateDyeingFirm,
    responses(
        (status = 200, description = "Firm updated", body = dyeing_firm::Model),
        (status = 409, description = "Name taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn update_firm(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDyeingFirm>,
) -> ApiResult<dyeing_firm::Model> {
    Ok(success_response(
        state.services.dyeing.update_firm(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/dyeing/firms/{id}",
    params(("id" = i32, Path, description = "Firm id")),
    responses(
        (status = 200, description = "Firm deleted"),
        (status = 409, description = "Firm has orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn delete_firm(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.dyeing.delete_firm(id).await?;
    Ok(message_response("Dyeing firm deleted"))
}

// Orders

#[utoipa::path(
    get,
    path = "/api/v1/dyeing/orders",
    params(DyeingOrderQuery),
    responses((status = 200, description = "Paginated orders", body = [DyeingOrderView])),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<DyeingOrderQuery>,
) -> ApiResult<PaginatedResponse<DyeingOrderView>> {
    let filter = DyeingOrderFilter {
        firm_id: query.firm_id,
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let orders = state.services.dyeing.list_orders(&filter, page).await?;
    Ok(success_response(paginated(orders, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dyeing/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = DyeingOrderView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<DyeingOrderView> {
    Ok(success_response(state.services.dyeing.get_order(id).await?))
}

/// Send yarn out for dyeing. The order number is assigned server-side.
#[utoipa::path(
    post,
    path = "/api/v1/dyeing/orders",
    request_body = CreateDyeingOrder,
    responses(
        (status = 201, description = "Order created", body = DyeingOrderView),
        (status = 400, description = "Invalid quantity or inactive firm", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown firm", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn create_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateDyeingOrder>,
) -> Result<(StatusCode, Json<ApiResponse<DyeingOrderView>>), ServiceError> {
    let order = state.services.dyeing.create_order(payload).await?;
    Ok(created_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/dyeing/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateDyeingOrder,
    responses(
        (status = 200, description = "Order updated", body = DyeingOrderView),
        (status = 400, description = "Quantity or firm changed after dispatch", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn update_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateDyeingOrder>,
) -> ApiResult<DyeingOrderView> {
    Ok(success_response(
        state.services.dyeing.update_order(id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/dyeing/orders/{id}/status",
    params(("id" = i32, Path, description = "Order id")),
    request_body = DyeingStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = DyeingOrderView),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn change_order_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<DyeingStatusUpdate>,
) -> ApiResult<DyeingOrderView> {
    Ok(success_response(
        state.services.dyeing.change_status(id, payload.status).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/dyeing/orders/{id}/receipts",
    params(("id" = i32, Path, description = "Order id")),
    request_body = DyeingReceipt,
    responses(
        (status = 200, description = "Receipt booked", body = DyeingOrderView),
        (status = 400, description = "Wrong status or over-receipt", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn record_receipt(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<DyeingReceipt>,
) -> ApiResult<DyeingOrderView> {
    Ok(success_response(
        state.services.dyeing.record_receipt(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/dyeing/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 409, description = "Order already dispatched", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "dyeing"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.dyeing.delete_order(id).await?;
    Ok(message_response("Dyeing order deleted"))
}
