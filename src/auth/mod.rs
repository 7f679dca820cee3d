/*!
 * # Authentication and Authorization Module
 *
 * JWT bearer authentication for the mill ERP:
 *
 * - HS256 access and refresh tokens carrying the user's role, resolved
 *   permissions and optional ASU unit
 * - Argon2id password verification against the `users` table
 * - Role-based access control with `resource:*` wildcards
 * - Per-unit data scoping for unit-bound accounts
 */

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ErrorResponse, ServiceError};
use crate::ApiResponse;

pub mod user;

mod password_policy;
mod permissions;
mod rbac;

pub use password_policy::*;
pub use permissions::*;
pub use rbac::*;

use user::UserProfile;

pub const TOKEN_USE_ACCESS: &str = "access";
pub const TOKEN_USE_REFRESH: &str = "refresh";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub name: Option<String>,     // User's name
    pub email: Option<String>,    // User's email
    pub role: String,             // Role name
    pub permissions: Vec<String>, // Resolved from the role at issue time
    pub unit: Option<i32>,        // ASU unit the account is bound to
    pub token_use: String,        // "access" or "refresh"
    pub jti: String,              // JWT ID (unique identifier for this token)
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub nbf: i64,                 // Not valid before time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub unit: Option<i32>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific permission (wildcards honoured)
    pub fn has_permission(&self, permission: &str) -> bool {
        RbacService::check_permission(&self.permissions, permission)
    }

    /// Whether this account may see data belonging to `unit`
    pub fn can_access_unit(&self, unit: i32) -> bool {
        self.unit.map_or(true, |own| own == unit)
    }

    pub fn ensure_unit_access(&self, unit: i32) -> Result<(), ServiceError> {
        if self.can_access_unit(unit) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "no access to data of unit {}",
                unit
            )))
        }
    }

    /// Resolve the unit filter for a list query.
    ///
    /// Unit-bound users get their own unit forced; asking for another is 403.
    pub fn scoped_unit(&self, requested: Option<i32>) -> Result<Option<i32>, ServiceError> {
        match (self.unit, requested) {
            (Some(own), Some(asked)) if own != asked => Err(ServiceError::Forbidden(format!(
                "no access to data of unit {}",
                asked
            ))),
            (Some(own), _) => Ok(Some(own)),
            (None, asked) => Ok(asked),
        }
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            name: claims.name,
            email: claims.email,
            role: claims.role,
            permissions: claims.permissions,
            unit: claims.unit,
            token_id: claims.jti,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }
}

impl From<&crate::config::AppConfig> for AuthConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            Duration::from_secs(cfg.refresh_token_expiration as u64),
        )
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    revoked_tokens: Arc<RwLock<Vec<RevokedToken>>>,
}

/// Revocation list entry
#[derive(Clone, Debug)]
struct RevokedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            revoked_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Issue an access/refresh pair for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            role: user.role.as_str().to_string(),
            permissions: RbacService::permissions_for(user.role),
            unit: user.unit,
            token_use: TOKEN_USE_ACCESS.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        // Refresh tokens carry no permissions; they are re-resolved on refresh
        let refresh_claims = Claims {
            sub: user.id.to_string(),
            name: None,
            email: None,
            role: user.role.as_str().to_string(),
            permissions: vec![],
            unit: user.unit,
            token_use: TOKEN_USE_REFRESH.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: refresh_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            refresh_token: self.sign(&refresh_claims)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_revoked(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Verify credentials and issue tokens
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = verify_password(&credentials.password, &account.password_hash)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        if !verified {
            warn!(user_id = %account.id, "Rejected login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !account.active {
            return Err(AuthError::AccountDisabled);
        }

        let mut active: user::ActiveModel = account.into();
        active.last_login_at = Set(Some(Utc::now()));
        let account = active.update(&*self.db).await?;

        let tokens = self.generate_token(&account)?;
        info!(user_id = %account.id, role = account.role.as_str(), "User logged in");

        Ok(LoginResponse {
            tokens,
            user: account.into(),
        })
    }

    /// Exchange a refresh token for a new pair; the old refresh token is revoked
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;
        if claims.token_use != TOKEN_USE_REFRESH {
            return Err(AuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        // Claim the jti before minting a new pair
        if !self.revoke_claims(&claims).await {
            warn!(user_id = %user_id, "Refresh token replayed");
            return Err(AuthError::RevokedToken);
        }
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .filter(|u| u.active)
            .ok_or(AuthError::InvalidToken)?;

        let pair = self.generate_token(&account)?;
        debug!(user_id = %user_id, "Rotated refresh token");

        Ok(pair)
    }

    /// Revoke a token (add it to the revocation list)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        self.revoke_claims(&claims).await;
        Ok(())
    }

    /// Add the token to the revocation list; `false` when it was already there
    async fn revoke_claims(&self, claims: &Claims) -> bool {
        let expiry = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        let mut revoked = self.revoked_tokens.write().await;

        // Expired tokens fail validation anyway
        let now = Utc::now();
        revoked.retain(|t| t.expiry > now);

        if revoked.iter().any(|t| t.jti == claims.jti) {
            return false;
        }
        revoked.push(RevokedToken {
            jti: claims.jti.clone(),
            expiry,
        });
        true
    }

    async fn is_token_revoked(&self, token_id: &str) -> bool {
        let revoked = self.revoked_tokens.read().await;
        revoked.iter().any(|t| t.jti == token_id)
    }

    /// Profile of the calling user
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the caller's own password
    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: &ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let verified = verify_password(&request.current_password, &account.password_hash)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        if !verified {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        PasswordPolicy::default()
            .validate(&request.new_password, Some(&account.email))
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let hash =
            hash_password(&request.new_password).map_err(|e| AuthError::InternalError(e.to_string()))?;
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(hash);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

/// Token pair response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Login credentials
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginCredentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Login response: token pair flattened next to the user profile
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Refresh token request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DbErr> for AuthError {
    fn from(err: DbErr) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            Self::AccountDisabled => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ACCOUNT_DISABLED",
                "Account disabled".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "AUTH_VALIDATION", msg.clone()),
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "authentication failure");
        }

        let mut body = ErrorResponse::new(status, message);
        body.code = code.to_string();
        (status, Json(body)).into_response()
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_permission(&required_permission) {
        debug!(
            user_id = %user.user_id,
            permission = %required_permission,
            "Permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extract authentication info from request headers
async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingAuth)?;
    let claims = auth_service.validate_token(token).await?;
    if claims.token_use != TOKEN_USE_ACCESS {
        return Err(AuthError::InvalidToken);
    }
    AuthUser::try_from(claims)
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    let protected = axum::Router::new()
        .route("/logout", axum::routing::post(logout_handler))
        .route("/me", axum::routing::get(me_handler))
        .route("/change-password", axum::routing::post(change_password_handler))
        .with_auth();

    axum::Router::new()
        .route("/login", axum::routing::post(login_handler))
        .route("/refresh", axum::routing::post(refresh_token_handler))
        .merge(protected)
        .layer(DefaultBodyLimit::max(1024 * 64)) // 64KB limit
}

/// Login handler
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials or account disabled", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    credentials
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    let response = auth_service.login(&credentials).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Refresh token handler
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh_token_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(refresh_request): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AuthError> {
    let token_pair = auth_service
        .refresh_token(&refresh_request.refresh_token)
        .await?;
    Ok(Json(ApiResponse::success(token_pair)))
}

/// Logout handler; revokes the presented access token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Token revoked")),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    auth_user: AuthUser,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<serde_json::Value>>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingAuth)?;
    auth_service.revoke_token(token).await?;
    info!(user_id = %auth_user.user_id, "User logged out");
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "message": "Successfully logged out" }),
    )))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Current user", body = UserProfile)),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(auth_service): State<Arc<AuthService>>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, AuthError> {
    let profile = auth_service.current_user(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Wrong current password or weak new password", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(auth_service): State<Arc<AuthService>>,
    auth_user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AuthError> {
    auth_service
        .change_password(auth_user.user_id, &request)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "message": "Password updated" }),
    )))
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::UserRole;

    fn auth_user(unit: Option<i32>, role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            name: None,
            email: None,
            role: role.as_str().to_string(),
            permissions: RbacService::permissions_for(role),
            unit,
            token_id: "t".into(),
        }
    }

    #[test]
    fn unit_bound_users_are_scoped() {
        let user = auth_user(Some(1), UserRole::Supervisor);
        assert_eq!(user.scoped_unit(None).unwrap(), Some(1));
        assert_eq!(user.scoped_unit(Some(1)).unwrap(), Some(1));
        assert!(matches!(
            user.scoped_unit(Some(2)),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(user.ensure_unit_access(2).is_err());
    }

    #[test]
    fn unbound_users_see_every_unit() {
        let user = auth_user(None, UserRole::Manager);
        assert_eq!(user.scoped_unit(None).unwrap(), None);
        assert_eq!(user.scoped_unit(Some(2)).unwrap(), Some(2));
        assert!(user.ensure_unit_access(2).is_ok());
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(AuthError::AccountDisabled.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InsufficientPermissions.parts().0,
            StatusCode::FORBIDDEN
        );
        let (status, _, message) = AuthError::DatabaseError("secret".into()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}
