mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp};
use serde_json::json;

async fn seed_count(app: &TestApp, name: &str, yarn_type: &str) -> i64 {
    let product = app
        .ok(
            Method::POST,
            "/api/v1/count-products",
            Some(json!({
                "count_name": name,
                "yarn_type": yarn_type,
                "quality": "Export",
                "rate_per_kg": 245.5
            })),
        )
        .await;
    assert_eq!(product["is_active"], true);
    product["id"].as_i64().unwrap()
}

#[tokio::test]
async fn count_products_are_managed_by_name() {
    let app = TestApp::new().await;
    let id = seed_count(&app, "30s", "Cotton Combed").await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/count-products",
            Some(json!({ "count_name": "30s", "yarn_type": "Polyester" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let updated = app
        .ok(
            Method::PUT,
            &format!("/api/v1/count-products/{id}"),
            Some(json!({ "rate_per_kg": 251.25, "is_active": false })),
        )
        .await;
    assert_eq!(updated["rate_per_kg"], 251.25);
    assert_eq!(updated["is_active"], false);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/count-products/{id}"),
            Some(json!({ "rate_per_kg": -1.0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let fetched = app
        .ok(Method::GET, &format!("/api/v1/count-products/{id}"), None)
        .await;
    assert_eq!(fetched["count_name"], "30s");

    app.ok(Method::DELETE, &format!("/api/v1/count-products/{id}"), None)
        .await;
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/count-products/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_ignores_case() {
    let app = TestApp::new().await;
    seed_count(&app, "40s", "Cotton Combed").await;
    seed_count(&app, "20s", "Polyester Viscose").await;

    let found = app
        .ok(Method::GET, "/api/v1/count-products?search=COMBED", None)
        .await;
    assert_eq!(found["total"], 1);
    assert_eq!(found["items"][0]["count_name"], "40s");
}

#[tokio::test]
async fn referenced_count_products_cannot_be_deleted() {
    let app = TestApp::new().await;
    let on_order = seed_count(&app, "60s", "Cotton Compact").await;
    let on_bom = seed_count(&app, "80s", "Cotton Compact").await;

    app.ok(
        Method::POST,
        "/api/v1/work-orders",
        Some(json!({
            "title": "60s compact for lot 4",
            "count_product_id": on_order,
            "target_quantity_kg": 500.0
        })),
    )
    .await;

    let item = app.seed_item("RM-COMPACT", 900.0, 160.0).await;
    app.ok(
        Method::POST,
        "/api/v1/boms",
        Some(json!({
            "bom_code": "bom-80s",
            "product_name": "80s compact yarn",
            "count_product_id": on_bom,
            "output_quantity_kg": 100.0,
            "lines": [{ "inventory_item_id": item, "quantity_per_batch": 118.0 }]
        })),
    )
    .await;

    for (id, holder) in [(on_order, "work order"), (on_bom, "BOM")] {
        let response = app
            .request_authenticated(Method::DELETE, &format!("/api/v1/count-products/{id}"), None)
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains(holder));
    }
}
