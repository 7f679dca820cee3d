mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_returns_tokens_and_profile() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "ADMIN@mill.test", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": "Spindle2024y" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "AUTH_INVALID_CREDENTIALS");

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "nobody@mill.test", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_reports_the_caller() {
    let app = TestApp::new().await;

    let me = app.ok(Method::GET, "/auth/me", None).await;
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["active"], true);
    assert!(!me["last_login_at"].is_null());
}

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    let body = json_body(response).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, "/auth/me", None, Some(&access))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": access })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new().await;
    let token = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .request(Method::POST, "/auth/logout", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/v1/inventory", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/inventory", None, Some(app.token()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/asu/machines", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/asu/machines", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_status_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["environment"], "test");
}

#[tokio::test]
async fn change_password_checks_current_password() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/auth/change-password",
            Some(json!({ "current_password": "wrong-one-1", "new_password": "Carding77frame" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.ok(
        Method::POST,
        "/auth/change-password",
        Some(json!({ "current_password": ADMIN_PASSWORD, "new_password": "Carding77frame" })),
    )
    .await;
    app.login(ADMIN_EMAIL, "Carding77frame").await;
}

#[tokio::test]
async fn concurrent_refresh_with_one_token_mints_one_pair() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    let body = json_body(response).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let app_ref = &app;
    let refresh = refresh.as_str();
    let attempt = move || async move {
        app_ref
            .request(
                Method::POST,
                "/auth/refresh",
                Some(json!({ "refresh_token": refresh })),
                None,
            )
            .await
            .status()
    };
    let (first, second) = tokio::join!(attempt(), attempt());

    let statuses = [first, second];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert!(statuses.contains(&StatusCode::UNAUTHORIZED));
}
