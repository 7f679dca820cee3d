use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::AuthUser,
    entities::count_product,
    errors::ServiceError,
    services::count_products::{CountProductFilter, CreateCountProduct, UpdateCountProduct},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CountProductQuery {
    pub active: Option<bool>,
    /// Substring of count name or yarn type
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/count-products",
    params(CountProductQuery),
    responses(
        (status = 200, description = "Paginated count products", body = [count_product::Model])
    ),
    security(("bearer_auth" = [])),
    tag = "count-products"
)]
pub async fn list_count_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CountProductQuery>,
) -> ApiResult<PaginatedResponse<count_product::Model>> {
    let filter = CountProductFilter {
        active: query.active,
        search: query.search,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let products = state.services.count_products.list(&filter, page).await?;
    Ok(success_response(paginated(products, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/count-products/{id}",
    params(("id" = i32, Path, description = "Count product id")),
    responses(
        (status = 200, description = "Count product", body = count_product::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "count-products"
)]
pub async fn get_count_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<count_product::Model> {
    Ok(success_response(state.services.count_products.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/count-products",
    request_body = CreateCountProduct,
    responses(
        (status = 201, description = "Created", body = count_product::Model),
        (status = 409, description = "Count name taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "count-products"
)]
pub async fn create_count_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateCountProduct>,
) -> Result<(StatusCode, Json<ApiResponse<count_product::Model>>), ServiceError> {
    let product = state.services.count_products.create(payload).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/count-products/{id}",
    params(("id" = i32, Path, description = "Count product id")),
    request_body = UpdateCountProduct,
    responses(
        (status = 200, description = "Updated", body = count_product::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Count name taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "count-products"
)]
pub async fn update_count_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCountProduct>,
) -> ApiResult<count_product::Model> {
    let product = state.services.count_products.update(id, payload).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/count-products/{id}",
    params(("id" = i32, Path, description = "Count product id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 409, description = "Referenced by dyeing orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "count-products"
)]
pub async fn delete_count_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<serde_json::Value> {
    state.services.count_products.delete(id).await?;
    Ok(message_response("Count product deleted"))
}
