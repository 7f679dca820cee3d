use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, message_response, page_request, paginated, success_response};
use crate::{
    auth::{
        user::{UserProfile, UserRole},
        AuthUser,
    },
    errors::ServiceError,
    services::users::{CreateUser, ResetPassword, UpdateUser, UserFilter},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub role: Option<String>,
    pub active: Option<bool>,
    /// Substring of name or email
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated users", body = [UserProfile]),
        (status = 403, description = "Requires users:manage", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<UserQuery>,
) -> ApiResult<PaginatedResponse<UserProfile>> {
    let role = query
        .role
        .as_deref()
        .map(str::parse::<UserRole>)
        .transpose()
        .map_err(ServiceError::ValidationError)?;
    let filter = UserFilter {
        role,
        active: query.active,
        search: query.search,
    };
    let page = page_request(query.page, query.limit, &state.config);
    let users = state.services.users.list(&filter, page).await?;
    Ok(success_response(paginated(users, page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<UserProfile> {
    Ok(success_response(state.services.users.get(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Weak password, unknown role or bad unit", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ServiceError> {
    let created = state.services.users.create(payload).await?;
    tracing::info!(actor = %user.user_id, user_id = %created.id, "Account provisioned");
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 409, description = "Would remove the last active admin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<UserProfile> {
    Ok(success_response(state.services.users.update(id, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reset-password",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = ResetPassword,
    responses(
        (status = 200, description = "Password replaced"),
        (status = 400, description = "Password policy violation", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPassword>,
) -> ApiResult<serde_json::Value> {
    state.services.users.reset_password(id, payload).await?;
    Ok(message_response("Password reset"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 409, description = "Self-delete or last active admin", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.users.delete(id, user.user_id).await?;
    Ok(message_response("User deleted"))
}
