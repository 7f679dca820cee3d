mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn both_shifts_are_recorded_with_machine_default_theoretical() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 1, 180.0).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machineNumber": 1,
                "date": "2024-05-01",
                "dayShift": { "actual_production": 150.0 },
                "nightShift": { "actual_production": 90.0, "remarks": "doffing delay" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let entries = body["data"].as_array().expect("created entries");
    assert_eq!(entries.len(), 2);

    let day = entries.iter().find(|e| e["shift"] == "day").unwrap();
    assert_eq!(day["theoretical_production"], 180.0);
    assert_eq!(day["percentage"], 83.33);
    assert_eq!(day["machine_number"], 1);

    let night = entries.iter().find(|e| e["shift"] == "night").unwrap();
    assert_eq!(night["percentage"], 50.0);
    assert_eq!(night["remarks"], "doffing delay");
}

#[tokio::test]
async fn duplicate_shift_for_same_machine_and_date_conflicts() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 4, 200.0).await;

    let payload = json!({
        "unit": 1,
        "machine_number": 4,
        "date": "2024-05-02",
        "day_shift": { "actual_production": 120.0 }
    });
    app.ok(Method::POST, "/api/v1/asu/production-entries", Some(payload.clone()))
        .await;

    let response = app
        .request_authenticated(Method::POST, "/api/v1/asu/production-entries", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let night_only = json!({
        "unit": 1,
        "machine_number": 4,
        "date": "2024-05-02",
        "night_shift": { "actual_production": 100.0 }
    });
    let response = app
        .request_authenticated(Method::POST, "/api/v1/asu/production-entries", Some(night_only))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn entry_requires_a_shift_and_a_known_machine() {
    let app = TestApp::new().await;
    app.seed_asu_machine(2, 1, 240.0).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({ "unit": 2, "machine_number": 1, "date": "2024-05-01" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 2,
                "machine_number": 9,
                "date": "2024-05-01",
                "day_shift": { "actual_production": 10.0 }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 2,
                "machine_number": 1,
                "date": "2024-05-01",
                "day_shift": { "actual_production": -5.0 }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn daily_view_pairs_shifts_and_summary_totals() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 1, 180.0).await;
    app.seed_asu_machine(1, 2, 100.0).await;

    for (machine, date, day, night) in [
        (1, "2024-06-01", 150.0, 90.0),
        (2, "2024-06-01", 80.0, 70.0),
        (1, "2024-06-02", 180.0, 180.0),
    ] {
        app.ok(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machine_number": machine,
                "date": date,
                "day_shift": { "actual_production": day },
                "night_shift": { "actual_production": night }
            })),
        )
        .await;
    }

    let daily = app
        .ok(
            Method::GET,
            "/api/v1/asu/production-entries/daily?unit=1&dateFrom=2024-06-01&dateTo=2024-06-02",
            None,
        )
        .await;
    assert_eq!(daily["total"], 3);
    let rows = daily["items"].as_array().unwrap();
    assert_eq!(rows[0]["date"], "2024-06-02");
    assert_eq!(rows[1]["machine_number"], 1);
    assert_eq!(rows[1]["total_actual"], 240.0);
    assert_eq!(rows[1]["total_theoretical"], 360.0);
    assert_eq!(rows[1]["percentage"], 66.67);
    assert_eq!(rows[1]["day_shift"]["actual_production"], 150.0);
    assert_eq!(rows[1]["night_shift"]["actual_production"], 90.0);
    assert_eq!(rows[2]["machine_number"], 2);

    let summary = app
        .ok(
            Method::GET,
            "/api/v1/asu/production-entries/summary?unit=1&dateFrom=2024-06-01&dateTo=2024-06-01",
            None,
        )
        .await;
    assert_eq!(summary["entry_count"], 4);
    assert_eq!(summary["machine_count"], 2);
    assert_eq!(summary["total_actual"], 390.0);
    assert_eq!(summary["total_theoretical"], 560.0);
    assert_eq!(summary["by_machine"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::GET,
            "/api/v1/asu/production-entries?dateFrom=2024-06-10&dateTo=2024-06-01",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn configuration_in_force_sets_theoretical_output() {
    let app = TestApp::new().await;
    let machine_id = app.seed_asu_machine(1, 7, 180.0).await;

    for (from, p100) in [("2024-01-01", 180.0), ("2024-03-01", 120.0)] {
        app.ok(
            Method::POST,
            &format!("/api/v1/asu/machines/{machine_id}/configurations"),
            Some(json!({
                "count": "40s",
                "yarn_type": "Cotton Combed",
                "spindles": 1008,
                "speed": 16000.0,
                "production_at_100": p100,
                "effective_from": from
            })),
        )
        .await;
    }

    let history = app
        .ok(
            Method::GET,
            &format!("/api/v1/asu/machines/{machine_id}/configurations"),
            None,
        )
        .await;
    let versions = history.as_array().expect("configuration history");
    assert_eq!(versions.len(), 2);
    assert!(versions
        .iter()
        .any(|v| v["version"] == 1 && v["effective_to"] == "2024-03-01"));

    let created = app
        .ok(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machine_number": 7,
                "date": "2024-02-15",
                "day_shift": { "actual_production": 90.0 }
            })),
        )
        .await;
    assert_eq!(created[0]["theoretical_production"], 180.0);

    let created = app
        .ok(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machine_number": 7,
                "date": "2024-03-15",
                "day_shift": { "actual_production": 90.0 }
            })),
        )
        .await;
    assert_eq!(created[0]["theoretical_production"], 120.0);
    assert_eq!(created[0]["percentage"], 75.0);
}

#[tokio::test]
async fn update_recomputes_percentage_and_delete_removes_entry() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 3, 200.0).await;

    let created = app
        .ok(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machine_number": 3,
                "date": "2024-07-01",
                "day_shift": { "actual_production": 100.0 }
            })),
        )
        .await;
    let id = created[0]["id"].as_i64().unwrap();

    let updated = app
        .ok(
            Method::PUT,
            &format!("/api/v1/asu/production-entries/{id}"),
            Some(json!({ "actual_production": 150.0 })),
        )
        .await;
    assert_eq!(updated["percentage"], 75.0);

    app.ok(
        Method::DELETE,
        &format!("/api/v1/asu/production-entries/{id}"),
        None,
    )
    .await;
    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/asu/production-entries/{id}"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unit_bound_supervisor_only_sees_own_unit() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 1, 180.0).await;
    app.seed_asu_machine(2, 1, 240.0).await;

    for unit in [1, 2] {
        app.ok(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": unit,
                "machine_number": 1,
                "date": "2024-08-01",
                "day_shift": { "actual_production": 100.0 }
            })),
        )
        .await;
    }

    let supervisor = app.token_for("supervisor", Some(2)).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/asu/production-entries",
            None,
            Some(&supervisor),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["unit"], 2);

    let response = app
        .request(
            Method::GET,
            "/api/v1/asu/production-entries?unit=1",
            None,
            Some(&supervisor),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machine_number": 1,
                "date": "2024-08-02",
                "day_shift": { "actual_production": 100.0 }
            })),
            Some(&supervisor),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inactive_machines_take_no_entries() {
    let app = TestApp::new().await;
    let id = app.seed_asu_machine(2, 7, 150.0).await;
    app.ok(
        Method::PUT,
        &format!("/api/v1/asu/machines/{id}"),
        Some(json!({ "is_active": false })),
    )
    .await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 2,
                "machine_number": 7,
                "date": "2024-07-01",
                "day_shift": { "actual_production": 140.0 }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("inactive"));
}

#[tokio::test]
async fn daily_view_pages_by_machine_day() {
    let app = TestApp::new().await;
    app.seed_asu_machine(1, 1, 180.0).await;
    app.seed_asu_machine(1, 2, 100.0).await;

    for (machine, date) in [(1, "2024-06-01"), (2, "2024-06-01"), (1, "2024-06-02")] {
        app.ok(
            Method::POST,
            "/api/v1/asu/production-entries",
            Some(json!({
                "unit": 1,
                "machine_number": machine,
                "date": date,
                "day_shift": { "actual_production": 90.0 }
            })),
        )
        .await;
    }

    let page = app
        .ok(
            Method::GET,
            "/api/v1/asu/production-entries/daily?unit=1&limit=2&page=2",
            None,
        )
        .await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}
