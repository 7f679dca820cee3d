use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::{production_job, production_job::JobStatus},
    errors::ServiceError,
    services::production_jobs::{
        CreateProductionJob, JobOutput, JobStatusUpdate, ProductionJobFilter,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductionJobQuery {
    pub status: Option<JobStatus>,
    pub machine_id: Option<i32>,
    pub work_order_id: Option<i32>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/production-jobs",
    params(ProductionJobQuery),
    responses((status = 200, description = "Paginated jobs", body = [production_job::Model])),
    security(("bearer_auth" = [])),
    tag = "production-jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ProductionJobQuery>,
) -> ApiResult<PaginatedResponse<production_job::Model>> {
    let filter = ProductionJobFilter {
        status: query.status,
        machine_id: query.machine_id,
        work_order_id: query.work_order_id,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let jobs = state.services.production_jobs.list(&filter, page).await?;
    Ok(success_response(paginated(jobs, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/production-jobs/{id}",
    params(("id" = i32, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = production_job::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production-jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<production_job::Model> {
    Ok(success_response(state.services.production_jobs.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/production-jobs",
    request_body = CreateProductionJob,
    responses(
        (status = 201, description = "Job queued", body = production_job::Model),
        (status = 400, description = "Retired machine or closed work order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown machine or work order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production-jobs"
)]
pub async fn create_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateProductionJob>,
) -> Result<(StatusCode, Json<ApiResponse<production_job::Model>>), ServiceError> {
    let job = state.services.production_jobs.create(payload).await?;
    Ok(created_response(job))
}

#[utoipa::path(
    put,
    path = "/api/v1/production-jobs/{id}/status",
    params(("id" = i32, Path, description = "Job id")),
    request_body = JobStatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = production_job::Model),
        (status = 400, description = "Transition not allowed or machine not operational", body = crate::errors::ErrorResponse),
        (status = 409, description = "Machine already running another job", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production-jobs"
)]
pub async fn change_job_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<JobStatusUpdate>,
) -> ApiResult<production_job::Model> {
    Ok(success_response(
        state
            .services
            .production_jobs
            .change_status(id, payload.status)
            .await?,
    ))
}

/// Book produced kilograms against a running job and its work order
#[utoipa::path(
    post,
    path = "/api/v1/production-jobs/{id}/output",
    params(("id" = i32, Path, description = "Job id")),
    request_body = JobOutput,
    responses(
        (status = 200, description = "Output recorded", body = production_job::Model),
        (status = 400, description = "Job is not running", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production-jobs"
)]
pub async fn record_output(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<JobOutput>,
) -> ApiResult<production_job::Model> {
    Ok(success_response(
        state.services.production_jobs.record_output(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/production-jobs/{id}",
    params(("id" = i32, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job deleted"),
        (status = 409, description = "Job has started", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "production-jobs"
)]
pub async fn delete_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.production_jobs.delete(id).await?;
    Ok(message_response("Production job deleted"))
}
