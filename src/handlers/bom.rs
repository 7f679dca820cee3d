use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::bom_header,
    errors::ServiceError,
    services::bom::{
        BomCost, BomDetail, BomFilter, BomLineInput, BomRequirements, CreateBom, UpdateBom,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BomQuery {
    pub active: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchQuery {
    /// Output kilograms to plan for; must be greater than 0
    #[param(value_type = f64)]
    pub quantity: Decimal,
}

#[utoipa::path(
    get,
    path = "/api/v1/boms",
    params(BomQuery),
    responses((status = 200, description = "Paginated BOM headers", body = [bom_header::Model])),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn list_boms(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<BomQuery>,
) -> ApiResult<PaginatedResponse<bom_header::Model>> {
    let filter = BomFilter {
        active: query.active,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let boms = state.services.boms.list(&filter, page).await?;
    Ok(success_response(paginated(boms, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}",
    params(("id" = i32, Path, description = "BOM id")),
    responses(
        (status = 200, description = "BOM with lines", body = BomDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn get_bom(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<BomDetail> {
    Ok(success_response(state.services.boms.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms",
    request_body = CreateBom,
    responses(
        (status = 201, description = "BOM created", body = BomDetail),
        (status = 400, description = "Invalid line or duplicate item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown inventory item", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn create_bom(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateBom>,
) -> Result<(StatusCode, Json<ApiResponse<BomDetail>>), ServiceError> {
    let bom = state.services.boms.create(payload).await?;
    Ok(created_response(bom))
}

#[utoipa::path(
    put,
    path = "/api/v1/boms/{id}",
    params(("id" = i32, Path, description = "BOM id")),
    request_body = UpdateBom,
    responses((status = 200, description = "Header updated", body = BomDetail)),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn update_bom(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBom>,
) -> ApiResult<BomDetail> {
    Ok(success_response(state.services.boms.update(id, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/boms/{id}/lines",
    params(("id" = i32, Path, description = "BOM id")),
    request_body = BomLineInput,
    responses(
        (status = 201, description = "Line added", body = BomDetail),
        (status = 400, description = "Item already on this BOM", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn add_line(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<BomLineInput>,
) -> Result<(StatusCode, Json<ApiResponse<BomDetail>>), ServiceError> {
    let bom = state.services.boms.add_line(id, payload).await?;
    Ok(created_response(bom))
}

#[utoipa::path(
    delete,
    path = "/api/v1/boms/{id}/lines/{line_id}",
    params(
        ("id" = i32, Path, description = "BOM id"),
        ("line_id" = i32, Path, description = "Line id")
    ),
    responses(
        (status = 200, description = "Line removed", body = BomDetail),
        (status = 404, description = "Line not on this BOM", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn remove_line(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((id, line_id)): Path<(i32, i32)>,
) -> ApiResult<BomDetail> {
    Ok(success_response(
        state.services.boms.remove_line(id, line_id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/boms/{id}",
    params(("id" = i32, Path, description = "BOM id")),
    responses((status = 200, description = "BOM and lines deleted")),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn delete_bom(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.boms.delete(id).await?;
    Ok(message_response("BOM deleted"))
}

/// Material needed for a batch against current stock
#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}/requirements",
    params(("id" = i32, Path, description = "BOM id"), BatchQuery),
    responses(
        (status = 200, description = "Per-line requirement and shortage", body = BomRequirements),
        (status = 400, description = "quantity missing or not positive", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn requirements(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<BatchQuery>,
) -> ApiResult<BomRequirements> {
    Ok(success_response(
        state.services.boms.requirements(id, query.quantity).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/boms/{id}/cost",
    params(("id" = i32, Path, description = "BOM id"), BatchQuery),
    responses((status = 200, description = "Material cost for the batch", body = BomCost)),
    security(("bearer_auth" = [])),
    tag = "boms"
)]
pub async fn cost(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<BatchQuery>,
) -> ApiResult<BomCost> {
    Ok(success_response(state.services.boms.cost(id, query.quantity).await?))
}
