use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::{
    config::AppConfig,
    services::{PageRequest, Paged},
    ApiResponse, PaginatedResponse,
};

/// Standard `200` envelope
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard `201` envelope
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Envelope for deletes and other bodiless successes
pub fn message_response(message: &str) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({ "message": message })))
}

/// Resolve `page`/`limit` query values against the configured defaults.
///
/// `limit` is capped at the configured maximum; zero values fall back to 1.
pub fn page_request(page: Option<u64>, limit: Option<u64>, config: &AppConfig) -> PageRequest {
    let limit = limit
        .unwrap_or(config.api_default_page_size)
        .min(config.api_max_page_size);
    PageRequest::new(page.unwrap_or(1), limit)
}

pub fn paginated<T>(paged: Paged<T>, page: PageRequest) -> PaginatedResponse<T> {
    PaginatedResponse::new(paged.items, paged.total, page.page, page.limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(default: u64, max: u64) -> AppConfig {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "handler_common_tests_secret_with_enough_length_to_pass_checks_12345678".to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        );
        cfg.api_default_page_size = default;
        cfg.api_max_page_size = max;
        cfg
    }

    #[test]
    fn limit_defaults_and_caps() {
        let cfg = config(20, 100);
        assert_eq!(page_request(None, None, &cfg), PageRequest::new(1, 20));
        assert_eq!(page_request(Some(3), Some(500), &cfg), PageRequest::new(3, 100));
        assert_eq!(page_request(Some(0), Some(0), &cfg), PageRequest::new(1, 1));
    }

    #[test]
    fn total_pages_round_up() {
        let response = paginated(
            Paged {
                items: vec![1, 2, 3],
                total: 45,
            },
            PageRequest::new(1, 20),
        );
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.limit, 20);
    }
}
