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
    entities::work_order::{WorkOrderPriority, WorkOrderStatus},
    errors::ServiceError,
    services::work_orders::{
        CreateWorkOrder, UpdateWorkOrder, WorkOrderFilter, WorkOrderStatusUpdate, WorkOrderView,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkOrderQuery {
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,
    /// Lower bound on the due date
    #[serde(rename = "dateFrom", alias = "date_from")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "dateTo", alias = "date_to")]
    pub date_to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders",
    params(WorkOrderQuery),
    responses((status = 200, description = "Paginated work orders", body = [WorkOrderView])),
    security(("bearer_auth" = [])),
    tag = "work-orders"
)]
pub async fn list_work_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<WorkOrderQuery>,
) -> ApiResult<PaginatedResponse<WorkOrderView>> {
    let filter = WorkOrderFilter {
        status: query.status,
        priority: query.priority,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let orders = state.services.work_orders.list(&filter, page).await?;
    Ok(success_response(paginated(orders, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    params(("id" = i32, Path, description = "Work order id")),
    responses(
        (status = 200, description = "Work order", body = WorkOrderView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "work-orders"
)]
pub async fn get_work_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<WorkOrderView> {
    Ok(success_response(state.services.work_orders.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders",
    request_body = CreateWorkOrder,
    responses(
        (status = 201, description = "Work order created", body = WorkOrderView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "work-orders"
)]
pub async fn create_work_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateWorkOrder>,
) -> Result<(StatusCode, Json<ApiResponse<WorkOrderView>>), ServiceError> {
    let order = state.services.work_orders.create(payload).await?;
    Ok(created_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}",
    params(("id" = i32, Path, description = "Work order id")),
    request_body = UpdateWorkOrder,
    responses(
        (status = 200, description = "Work order updated", body = WorkOrderView),
        (status = 400, description = "Order is closed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "work-orders"
)]
pub async fn update_work_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateWorkOrder>,
) -> ApiResult<WorkOrderView> {
    Ok(success_response(
        state.services.work_orders.update(id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/status",
    params(("id" = i32, Path, description = "Work order id")),
    request_body = WorkOrderStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = WorkOrderView),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "work-orders"
)]
pub async fn change_work_order_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<WorkOrderStatusUpdate>,
) -> ApiResult<WorkOrderView> {
    Ok(success_response(
        state.services.work_orders.change_status(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/work-orders/{id}",
    params(("id" = i32, Path, description = "Work order id")),
    responses(
        (status = 200, description = "Work order deleted"),
        (status = 409, description = "Order already started", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "work-orders"
)]
pub async fn delete_work_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.work_orders.delete(id).await?;
    Ok(message_response("Work order deleted"))
}
