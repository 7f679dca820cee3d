use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "error": "Not found: ASU machine 7 in unit 1",
    "code": "Not Found",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Always `false`
    #[schema(example = false)]
    pub success: bool,
    /// Human-readable error description
    #[schema(example = "Not found: ASU machine 7 in unit 1")]
    pub error: String,
    /// HTTP status category (e.g., "Not Found", "Bad Request", "Conflict")
    #[schema(example = "Not Found")]
    pub code: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    #[schema(example = "2024-12-09T10:30:00.000Z")]
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            success: false,
            error: message,
            code: status.canonical_reason().unwrap_or("Error").to_string(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[serde(skip)] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ServiceError::Conflict(format!("duplicate record ({})", detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                ServiceError::Conflict(format!("record is referenced elsewhere ({})", detail))
            }
            _ => ServiceError::DatabaseError(err),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::InvalidInput(_)
            | Self::InvalidStatus(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthError(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError(_)
            | Self::HashError(_)
            | Self::MigrationError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_)
            | Self::HashError(_)
            | Self::MigrationError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, key))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse::new(status, self.response_message());
        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("machine 4".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!payload.success);
        assert_eq!(payload.code, "Not Found");
        assert_eq!(payload.error, "Not found: machine 4");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidStatus("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::HashError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("select * from users".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::Conflict("machine 3 already exists in unit 1".into()).response_message(),
            "Conflict: machine 3 already exists in unit 1"
        );
    }

    #[test]
    fn custom_db_errors_stay_internal() {
        let err: ServiceError = DbErr::Custom("pool closed".into()).into();
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
