use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::{asu_machine, machine_configuration},
    errors::ServiceError,
    services::asu_machines::{
        AsuMachineFilter, CreateAsuMachine, CreateConfiguration, UpdateAsuMachine,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AsuMachineQuery {
    pub unit: Option<i32>,
    pub active: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// List ASU machines
#[utoipa::path(
    get,
    path = "/api/v1/asu/machines",
    params(AsuMachineQuery),
    responses(
        (status = 200, description = "Paginated machines", body = [asu_machine::Model]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn list_machines(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AsuMachineQuery>,
) -> ApiResult<PaginatedResponse<asu_machine::Model>> {
    let filter = AsuMachineFilter {
        unit: user.scoped_unit(query.unit)?,
        active: query.active,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let machines = state.services.asu_machines.list(&filter, page).await?;
    Ok(success_response(paginated(machines, page)))
}

async fn machine_in_scope(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> Result<asu_machine::Model, ServiceError> {
    let machine = state.services.asu_machines.get(id).await?;
    user.ensure_unit_access(machine.unit)?;
    Ok(machine)
}

#[utoipa::path(
    get,
    path = "/api/v1/asu/machines/{id}",
    params(("id" = i32, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Machine", body = asu_machine::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn get_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<asu_machine::Model> {
    Ok(success_response(machine_in_scope(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/asu/machines",
    request_body = CreateAsuMachine,
    responses(
        (status = 201, description = "Machine created", body = asu_machine::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Machine number taken in unit", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn create_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAsuMachine>,
) -> Result<(StatusCode, Json<ApiResponse<asu_machine::Model>>), ServiceError> {
    user.ensure_unit_access(payload.unit)?;
    let machine = state.services.asu_machines.create(payload).await?;
    Ok(created_response(machine))
}

#[utoipa::path(
    put,
    path = "/api/v1/asu/machines/{id}",
    params(("id" = i32, Path, description = "Machine id")),
    request_body = UpdateAsuMachine,
    responses(
        (status = 200, description = "Machine updated", body = asu_machine::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Machine number taken in unit", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn update_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAsuMachine>,
) -> ApiResult<asu_machine::Model> {
    machine_in_scope(&state, &user, id).await?;
    if let Some(unit) = payload.unit {
        user.ensure_unit_access(unit)?;
    }
    let machine = state.services.asu_machines.update(id, payload).await?;
    Ok(success_response(machine))
}

#[utoipa::path(
    delete,
    path = "/api/v1/asu/machines/{id}",
    params(("id" = i32, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Machine deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Machine has production entries", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn delete_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    machine_in_scope(&state, &user, id).await?;
    state.services.asu_machines.delete(id).await?;
    Ok(message_response("ASU machine deleted"))
}

/// Configuration history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/asu/machines/{id}/configurations",
    params(("id" = i32, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Configuration versions", body = [machine_configuration::Model]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn list_configurations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Vec<machine_configuration::Model>> {
    machine_in_scope(&state, &user, id).await?;
    let versions = state.services.asu_machines.list_configurations(id).await?;
    Ok(success_response(versions))
}

#[utoipa::path(
    post,
    path = "/api/v1/asu/machines/{id}/configurations",
    params(("id" = i32, Path, description = "Machine id")),
    request_body = CreateConfiguration,
    responses(
        (status = 201, description = "New configuration version", body = machine_configuration::Model),
        (status = 400, description = "effective_from precedes the open version", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "asu-machines"
)]
pub async fn add_configuration(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CreateConfiguration>,
) -> Result<(StatusCode, Json<ApiResponse<machine_configuration::Model>>), ServiceError> {
    machine_in_scope(&state, &user, id).await?;
    let version = state
        .services
        .asu_machines
        .add_configuration(id, payload, Some(user.user_id))
        .await?;
    Ok(created_response(version))
}
