mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp};
use serde_json::json;

async fn record_day_shift(app: &TestApp, unit: i32, machine_no: i32, date: &str) {
    app.ok(
        Method::POST,
        "/api/v1/asu/production-entries",
        Some(json!({
            "unit": unit,
            "machine_number": machine_no,
            "date": date,
            "day_shift": { "actual_production": 120.0 }
        })),
    )
    .await;
}

#[tokio::test]
async fn machine_numbers_are_unique_per_unit() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 3, 180.0).await;
    app.seed_asu_machine(2, 3, 180.0).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/asu/machines",
            Some(json!({
                "unit": 1,
                "machine_no": 3,
                "machine_name": "ASU-1-03 again",
                "count": "30s",
                "yarn_type": "Cotton Combed"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let unit_one = app.ok(Method::GET, "/api/v1/asu/machines?unit=1", None).await;
    assert_eq!(unit_one["total"], 1);
}

#[tokio::test]
async fn machines_with_history_are_deactivated_not_deleted() {
    let app = TestApp::new().await;
    let id = app.seed_asu_machine(1, 5, 160.0).await;
    record_day_shift(&app, 1, 5, "2024-08-01").await;

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/asu/machines/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("deactivate instead"));

    let updated = app
        .ok(
            Method::PUT,
            &format!("/api/v1/asu/machines/{id}"),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(updated["is_active"], false);

    let spare = app.seed_asu_machine(1, 6, 160.0).await;
    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/asu/machines/{spare}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unit_moves_only_before_production_is_recorded() {
    let app = TestApp::new().await;
    let busy = app.seed_asu_machine(1, 8, 180.0).await;
    let idle = app.seed_asu_machine(1, 9, 180.0).await;
    record_day_shift(&app, 1, 8, "2024-08-02").await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/asu/machines/{busy}"),
            Some(json!({ "unit": 2 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("unit cannot change"));

    let moved = app
        .ok(
            Method::PUT,
            &format!("/api/v1/asu/machines/{idle}"),
            Some(json!({ "unit": 2 })),
        )
        .await;
    assert_eq!(moved["unit"], 2);

    let entries = app
        .ok(Method::GET, "/api/v1/asu/production-entries?unit=1", None)
        .await;
    assert_eq!(entries["total"], 1);
}

#[tokio::test]
async fn configuration_cannot_start_before_the_open_version() {
    let app = TestApp::new().await;
    let id = app.seed_asu_machine(1, 11, 180.0).await;
    let uri = format!("/api/v1/asu/machines/{id}/configurations");

    let config = |from: &str| {
        json!({
            "count": "40s",
            "yarn_type": "Cotton Combed",
            "spindles": 1008,
            "speed": 16000.0,
            "production_at_100": 150.0,
            "effective_from": from
        })
    };

    app.ok(Method::POST, &uri, Some(config("2024-05-01"))).await;

    let response = app
        .request_authenticated(Method::POST, &uri, Some(config("2024-04-01")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let history = app.ok(Method::GET, &uri, None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert!(history[0]["effective_to"].is_null());
}
