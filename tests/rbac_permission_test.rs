mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp, USER_PASSWORD};
use serde_json::{json, Value};

async fn create_user(app: &TestApp, email: &str, role: &str, password: &str) -> axum::response::Response {
    app.request_authenticated(
        Method::POST,
        "/api/v1/users",
        Some(json!({
            "name": "Shift Clerk",
            "email": email,
            "password": password,
            "role": role
        })),
    )
    .await
}

#[tokio::test]
async fn viewer_reads_but_cannot_write() {
    let app = TestApp::new().await;
    let viewer = app.token_for("viewer", None).await;

    let response = app
        .request(Method::GET, "/api/v1/inventory", None, Some(&viewer))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/v1/dyeing/firms",
            Some(json!({ "name": "Viewer Dyers" })),
            Some(&viewer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn operator_cannot_touch_stock() {
    let app = TestApp::new().await;
    let item = app.seed_item("RM-COTTON", 100.0, 150.0).await;
    let operator = app.token_for("operator", Some(1)).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory/{item}/adjust"),
            Some(json!({ "kind": "issue", "quantity": 5.0, "reason": "floor" })),
            Some(&operator),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/api/v1/inventory", None, Some(&operator))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/api/v1/work-orders", None, Some(&operator))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn only_admin_manages_users() {
    let app = TestApp::new().await;
    let manager = app.token_for("manager", None).await;

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&manager))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/api/v1/inventory", None, Some(&manager))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let users = app.ok(Method::GET, "/api/v1/users", None).await;
    assert_eq!(users["total"], 2);
}

#[tokio::test]
async fn account_creation_enforces_role_password_and_email_rules() {
    let app = TestApp::new().await;

    let response = create_user(&app, "clerk@mill.test", "foreman", USER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = create_user(&app, "clerk@mill.test", "operator", "password1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = create_user(&app, "clerk@mill.test", "operator", "short1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = create_user(&app, "clerk@mill.test", "operator", USER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["role"], "operator");

    let response = create_user(&app, "Clerk@Mill.test", "viewer", USER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn last_admin_and_self_are_protected() {
    let app = TestApp::new().await;
    let me: Value = app.ok(Method::GET, "/auth/me", None).await;
    let admin_id = me["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/users/{admin_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/users/{admin_id}"),
            Some(json!({ "role": "viewer" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/users/{admin_id}"),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let second_admin = app.token_for("admin", None).await;
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{admin_id}"),
            None,
            Some(&second_admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reset_password_and_deactivation_affect_login() {
    let app = TestApp::new().await;
    let response = create_user(&app, "doffer@mill.test", "operator", USER_PASSWORD).await;
    let body = json_body(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/users/{id}/reset-password"),
            Some(json!({ "new_password": "abc" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.ok(
        Method::POST,
        &format!("/api/v1/users/{id}/reset-password"),
        Some(json!({ "new_password": "Bobbin88winder" })),
    )
    .await;
    app.login("doffer@mill.test", "Bobbin88winder").await;

    let updated = app
        .ok(
            Method::PUT,
            &format!("/api/v1/users/{id}"),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(updated["active"], false);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "doffer@mill.test", "password": "Bobbin88winder" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTH_ACCOUNT_DISABLED");

    let filtered = app
        .ok(Method::GET, "/api/v1/users?active=false", None)
        .await;
    assert_eq!(filtered["total"], 1);
    assert_eq!(filtered["items"][0]["email"], "doffer@mill.test");
}

#[tokio::test]
async fn user_search_ignores_case() {
    let app = TestApp::new().await;
    let response = create_user(&app, "winder@mill.test", "operator", USER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let by_name = app.ok(Method::GET, "/api/v1/users?search=SHIFT", None).await;
    assert_eq!(by_name["total"], 1);
    assert_eq!(by_name["items"][0]["email"], "winder@mill.test");

    let by_email = app
        .ok(Method::GET, "/api/v1/users?search=Winder@Mill", None)
        .await;
    assert_eq!(by_email["total"], 1);
}

#[tokio::test]
async fn demoting_two_admins_at_once_keeps_one() {
    let app = TestApp::new().await;
    let me: Value = app.ok(Method::GET, "/auth/me", None).await;
    let first = me["id"].as_str().unwrap().to_string();
    let response = create_user(&app, "second.admin@mill.test", "admin", USER_PASSWORD).await;
    let body = json_body(response).await;
    let second = body["data"]["id"].as_str().unwrap().to_string();

    let app_ref = &app;
    let demote = move |id: String| async move {
        app_ref
            .request_authenticated(
                Method::PUT,
                &format!("/api/v1/users/{id}"),
                Some(json!({ "role": "viewer" })),
            )
            .await
            .status()
    };
    let (a, b) = tokio::join!(demote(first), demote(second));
    assert!(a == StatusCode::OK || b == StatusCode::OK);

    let admins = app.ok(Method::GET, "/api/v1/users?role=admin", None).await;
    assert_eq!(admins["total"], 1);
}
