mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_normalises_sku_and_writes_opening_ledger_row() {
    let app = TestApp::new().await;
    let id = app.seed_item("rm-cotton-s6", 500.0, 162.5).await;

    let item = app
        .ok(Method::GET, &format!("/api/v1/inventory/{id}"), None)
        .await;
    assert_eq!(item["sku"], "RM-COTTON-S6");
    assert_eq!(item["quantity"], 500.0);

    let ledger = app
        .ok(
            Method::GET,
            &format!("/api/v1/inventory/{id}/transactions"),
            None,
        )
        .await;
    assert_eq!(ledger["total"], 1);
    assert_eq!(ledger["items"][0]["kind"], "opening");
    assert_eq!(ledger["items"][0]["balance_after"], 500.0);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/inventory",
            Some(json!({
                "sku": "RM-COTTON-S6",
                "name": "Duplicate",
                "category": "raw_material",
                "unit_of_measure": "kg"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn adjustments_move_stock_and_append_to_ledger() {
    let app = TestApp::new().await;
    let id = app.seed_item("DYE-REACT-RED", 80.0, 940.0).await;
    let adjust = format!("/api/v1/inventory/{id}/adjust");

    let received = app
        .ok(
            Method::POST,
            &adjust,
            Some(json!({ "kind": "receive", "quantity": 20.0, "reason": "GRN 4411" })),
        )
        .await;
    assert_eq!(received["item"]["quantity"], 100.0);
    assert_eq!(received["transaction"]["quantity_change"], 20.0);

    let issued = app
        .ok(
            Method::POST,
            &adjust,
            Some(json!({ "kind": "issue", "quantity": 35.5, "reason": "Batch 17", "reference": "DYE-17" })),
        )
        .await;
    assert_eq!(issued["item"]["quantity"], 64.5);
    assert_eq!(issued["transaction"]["quantity_change"], -35.5);
    assert_eq!(issued["transaction"]["reference"], "DYE-17");

    let counted = app
        .ok(
            Method::POST,
            &adjust,
            Some(json!({ "kind": "set", "quantity": 60.0, "reason": "Stock take" })),
        )
        .await;
    assert_eq!(counted["transaction"]["quantity_change"], -4.5);
    assert_eq!(counted["transaction"]["balance_after"], 60.0);

    let ledger = app
        .ok(
            Method::GET,
            &format!("/api/v1/inventory/{id}/transactions"),
            None,
        )
        .await;
    assert_eq!(ledger["total"], 4);
    assert_eq!(ledger["items"][0]["kind"], "set");
}

#[tokio::test]
async fn issuing_more_than_on_hand_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let id = app.seed_item("CHEM-SODA-ASH", 40.0, 38.0).await;

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/inventory/{id}/adjust"),
            Some(json!({ "kind": "issue", "quantity": 41.0, "reason": "Batch 3" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let item = app
        .ok(Method::GET, &format!("/api/v1/inventory/{id}"), None)
        .await;
    assert_eq!(item["quantity"], 40.0);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/inventory/{id}/adjust"),
            Some(json!({ "kind": "receive", "quantity": 5.0, "reason": "" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn low_stock_lists_items_at_or_below_reorder_level() {
    let app = TestApp::new().await;
    app.seed_item("PACK-CONE-PAPER", 10.0, 2.4).await;
    app.seed_item("RM-VISCOSE", 900.0, 140.0).await;

    let low = app.ok(Method::GET, "/api/v1/inventory/low-stock", None).await;
    let skus: Vec<&str> = low
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["sku"].as_str())
        .collect();
    assert_eq!(skus, vec!["PACK-CONE-PAPER"]);

    let filtered = app
        .ok(Method::GET, "/api/v1/inventory?low_stock=true", None)
        .await;
    assert_eq!(filtered["total"], 1);

    let searched = app
        .ok(Method::GET, "/api/v1/inventory?search=VISCOSE", None)
        .await;
    assert_eq!(searched["items"][0]["sku"], "RM-VISCOSE");
}

#[tokio::test]
async fn deleting_item_removes_its_ledger() {
    let app = TestApp::new().await;
    let id = app.seed_item("RM-POLY", 50.0, 120.0).await;

    app.ok(Method::DELETE, &format!("/api/v1/inventory/{id}"), None)
        .await;

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/inventory/{id}/transactions"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn search_matches_regardless_of_case() {
    let app = TestApp::new().await;
    app.seed_item("RM-VISCOSE", 900.0, 140.0).await;
    app.seed_item("RM-COTTON", 500.0, 160.0).await;

    let searched = app
        .ok(Method::GET, "/api/v1/inventory?search=viscose", None)
        .await;
    assert_eq!(searched["total"], 1);
    assert_eq!(searched["items"][0]["sku"], "RM-VISCOSE");

    let searched = app
        .ok(Method::GET, "/api/v1/inventory?search=item%20rm", None)
        .await;
    assert_eq!(searched["total"], 2);
}

#[tokio::test]
async fn fractional_issues_drain_stock_exactly() {
    let app = TestApp::new().await;
    let id = app.seed_item("CHEM-ACETIC", 0.3, 55.0).await;
    let adjust = format!("/api/v1/inventory/{id}/adjust");

    for quantity in [0.1, 0.2] {
        app.ok(
            Method::POST,
            &adjust,
            Some(json!({ "kind": "issue", "quantity": quantity, "reason": "Dye bath" })),
        )
        .await;
    }
    let item = app
        .ok(Method::GET, &format!("/api/v1/inventory/{id}"), None)
        .await;
    assert_eq!(item["quantity"], 0.0);

    let response = app
        .request_authenticated(
            Method::POST,
            &adjust,
            Some(json!({ "kind": "issue", "quantity": 0.001, "reason": "Dye bath" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn page_far_past_the_end_is_empty_not_an_error() {
    let app = TestApp::new().await;
    app.seed_item("RM-COTTON", 500.0, 160.0).await;

    let page = app
        .ok(
            Method::GET,
            "/api/v1/inventory?page=18446744073709551615&limit=20",
            None,
        )
        .await;
    assert_eq!(page["total"], 1);
    assert!(page["items"].as_array().unwrap().is_empty());
    assert_eq!(page["total_pages"], 1);
}
