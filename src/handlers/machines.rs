use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::{machine, machine::MachineStatus},
    errors::ServiceError,
    services::machines::{CreateMachine, MachineFilter, MachineStatusUpdate, UpdateMachine},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MachineQuery {
    pub status: Option<MachineStatus>,
    pub machine_type: Option<String>,
    pub department: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/machines",
    params(MachineQuery),
    responses((status = 200, description = "Paginated plant machines", body = [machine::Model])),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn list_machines(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<MachineQuery>,
) -> ApiResult<PaginatedResponse<machine::Model>> {
    let filter = MachineFilter {
        status: query.status,
        machine_type: query.machine_type,
        department: query.department,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let machines = state.services.machines.list(&filter, page).await?;
    Ok(success_response(paginated(machines, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/machines/{id}",
    params(("id" = i32, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Machine", body = machine::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn get_machine(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<machine::Model> {
    Ok(success_response(state.services.machines.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/machines",
    request_body = CreateMachine,
    responses(
        (status = 201, description = "Machine created", body = machine::Model),
        (status = 409, description = "Code taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn create_machine(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateMachine>,
) -> Result<(StatusCode, Json<ApiResponse<machine::Model>>), ServiceError> {
    let machine = state.services.machines.create(payload).await?;
    Ok(created_response(machine))
}

#[utoipa::path(
    put,
    path = "/api/v1/machines/{id}",
    params(("id" = i32, Path, description = "Machine id")),
    request_body = UpdateMachine,
    responses(
        (status = 200, description = "Machine updated", body = machine::Model),
        (status = 409, description = "Code taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn update_machine(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMachine>,
) -> ApiResult<machine::Model> {
    Ok(success_response(
        state.services.machines.update(id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/machines/{id}/status",
    params(("id" = i32, Path, description = "Machine id")),
    request_body = MachineStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = machine::Model),
        (status = 400, description = "Machine is retired", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn change_machine_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<MachineStatusUpdate>,
) -> ApiResult<machine::Model> {
    Ok(success_response(
        state.services.machines.change_status(id, payload.status).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/machines/{id}",
    params(("id" = i32, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Machine deleted"),
        (status = 409, description = "Machine has jobs", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn delete_machine(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.machines.delete(id).await?;
    Ok(message_response("Machine deleted"))
}
