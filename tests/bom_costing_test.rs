mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

fn line_for<'a>(lines: &'a Value, sku: &str) -> &'a Value {
    lines
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["sku"] == sku)
        .unwrap_or_else(|| panic!("no line for {sku}"))
}

#[tokio::test]
async fn requirements_and_cost_scale_with_batch_quantity() {
    let app = TestApp::new().await;
    let cotton = app.seed_item("RM-COTTON", 500.0, 160.0).await;
    let cones = app.seed_item("PACK-CONE", 10.0, 2.0).await;

    let bom = app
        .ok(
            Method::POST,
            "/api/v1/boms",
            Some(json!({
                "bom_code": "bom-30s-cw",
                "product_name": "30s combed warp",
                "output_quantity_kg": 100.0,
                "lines": [
                    { "inventory_item_id": cotton, "quantity_per_batch": 110.0 },
                    { "inventory_item_id": cones, "quantity_per_batch": 50.0, "wastage_percent": 2.0 }
                ]
            })),
        )
        .await;
    assert_eq!(bom["bom_code"], "BOM-30S-CW");
    assert_eq!(bom["revision"], "A");
    assert_eq!(bom["lines"].as_array().unwrap().len(), 2);
    let id = bom["id"].as_i64().unwrap();

    let requirements = app
        .ok(
            Method::GET,
            &format!("/api/v1/boms/{id}/requirements?quantity=200"),
            None,
        )
        .await;
    assert_eq!(requirements["can_produce"], false);
    let cotton_line = line_for(&requirements["lines"], "RM-COTTON");
    assert_eq!(cotton_line["required"], 220.0);
    assert_eq!(cotton_line["shortage"], 0.0);
    let cone_line = line_for(&requirements["lines"], "PACK-CONE");
    assert_eq!(cone_line["required"], 102.0);
    assert_eq!(cone_line["shortage"], 92.0);

    let cost = app
        .ok(Method::GET, &format!("/api/v1/boms/{id}/cost?quantity=200"), None)
        .await;
    assert_eq!(cost["material_cost"], 35404.0);
    assert_eq!(cost["cost_per_kg"], 177.02);
    assert_eq!(line_for(&cost["lines"], "PACK-CONE")["cost"], 204.0);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/boms/{id}/requirements?quantity=0"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lines_can_be_added_and_removed_but_not_duplicated() {
    let app = TestApp::new().await;
    let cotton = app.seed_item("RM-COTTON", 100.0, 160.0).await;
    let wax = app.seed_item("CHEM-WAX", 20.0, 300.0).await;

    let bom = app
        .ok(
            Method::POST,
            "/api/v1/boms",
            Some(json!({
                "bom_code": "BOM-40S",
                "product_name": "40s hosiery",
                "output_quantity_kg": 50.0,
                "lines": [{ "inventory_item_id": cotton, "quantity_per_batch": 56.0 }]
            })),
        )
        .await;
    let id = bom["id"].as_i64().unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/boms/{id}/lines"),
            Some(json!({ "inventory_item_id": cotton, "quantity_per_batch": 1.0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/boms/{id}/lines"),
            Some(json!({ "inventory_item_id": wax, "quantity_per_batch": 0.4 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let detail = app.ok(Method::GET, &format!("/api/v1/boms/{id}"), None).await;
    let lines = detail["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    let wax_line = line_for(&detail["lines"], "CHEM-WAX")["id"].as_i64().unwrap();

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/inventory/{wax}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let detail = app
        .ok(
            Method::DELETE,
            &format!("/api/v1/boms/{id}/lines/{wax_line}"),
            None,
        )
        .await;
    assert_eq!(detail["lines"].as_array().unwrap().len(), 1);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/boms",
            Some(json!({
                "bom_code": "bom-40s",
                "product_name": "Duplicate",
                "output_quantity_kg": 50.0
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    app.ok(Method::DELETE, &format!("/api/v1/boms/{id}"), None).await;
    app.ok(Method::DELETE, &format!("/api/v1/inventory/{wax}"), None)
        .await;
}

#[tokio::test]
async fn yarn_cost_builds_up_per_kg_and_batch_values() {
    let app = TestApp::new().await;

    let breakdown = app
        .ok(
            Method::POST,
            "/api/v1/costing/yarn",
            Some(json!({
                "raw_material_rate_per_kg": 160.0,
                "yield_percent": 80.0,
                "power_cost_per_kg": 12.5,
                "labour_cost_per_kg": 8.25,
                "overhead_cost_per_kg": 4.0,
                "packing_cost_per_kg": 1.25,
                "margin_percent": 10.0,
                "quantity_kg": 500.0
            })),
        )
        .await;
    assert_eq!(breakdown["effective_material_cost"], 200.0);
    assert_eq!(breakdown["conversion_cost"], 26.0);
    assert_eq!(breakdown["dyeing_cost"], 0.0);
    assert_eq!(breakdown["total_cost_per_kg"], 226.0);
    assert_eq!(breakdown["margin_amount"], 22.6);
    assert_eq!(breakdown["selling_price_per_kg"], 248.6);
    assert_eq!(breakdown["batch_total_cost"], 113000.0);
    assert_eq!(breakdown["batch_selling_value"], 124300.0);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/costing/yarn",
            Some(json!({ "raw_material_rate_per_kg": 160.0, "yield_percent": 0.0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn yarn_cost_out_of_range_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/costing/yarn",
            Some(json!({ "raw_material_rate_per_kg": 1e27, "yield_percent": 1.0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/costing/yarn",
            Some(json!({
                "raw_material_rate_per_kg": 150.0,
                "yield_percent": 85.0,
                "quantity_kg": 7.9e28
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
