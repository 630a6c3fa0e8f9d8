//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::UserId;
use domain::Money;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, api::InMemoryBackends) {
    let (state, backends) = api::create_in_memory_state();
    let app = api::create_app(state, get_metrics_handle());
    (app, backends)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn address_json() -> serde_json::Value {
    json!({
        "recipient": "Jo Moreno",
        "line1": "1 Harbor Way",
        "city": "Oakland",
        "region": "CA",
        "postal_code": "94607",
        "country": "US"
    })
}

async fn create_order(
    app: &axum::Router,
    backends: &api::InMemoryBackends,
) -> (serde_json::Value, UserId) {
    let user_id = backends.users.insert_active("Ada", "ada@example.com");
    let widget = backends
        .catalog
        .insert_priced("Widget", Money::from_cents(1000));
    let gadget = backends
        .catalog
        .insert_priced("Gadget", Money::from_cents(500));

    let (status, body) = send(
        app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id.to_string(),
            "items": [
                { "product_id": widget.to_string(), "quantity": 2 },
                { "product_id": gadget.to_string(), "quantity": 1 },
            ],
            "shipping_address": address_json(),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "create order failed: {body}");
    (body, user_id)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_and_get_order() {
    let (app, backends) = setup();
    let (order, _) = create_order(&app, &backends).await;

    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["payment_status"], "PENDING");
    assert_eq!(order["amounts"]["subtotal"], 2500);
    assert_eq!(order["amounts"]["total_amount"], 2500);
    assert!(
        order["order_number"]
            .as_str()
            .unwrap()
            .starts_with("ORD-")
    );

    let id = order["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["order_number"], order["order_number"]);
    assert_eq!(fetched["items"][0]["product_name"], "Widget");
}

#[tokio::test]
async fn test_create_order_unknown_user_is_404() {
    let (app, backends) = setup();
    let widget = backends
        .catalog
        .insert_priced("Widget", Money::from_cents(1000));

    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": uuid::Uuid::new_v4().to_string(),
            "items": [{ "product_id": widget.to_string(), "quantity": 1 }],
            "shipping_address": address_json(),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_amount_mismatch_is_400() {
    let (app, backends) = setup();
    let user_id = backends.users.insert_active("Ada", "ada@example.com");
    let widget = backends
        .catalog
        .insert_priced("Widget", Money::from_cents(1000));

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "user_id": user_id.to_string(),
            "items": [{ "product_id": widget.to_string(), "quantity": 1 }],
            "total_cents": 123,
            "shipping_address": address_json(),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn test_status_update_guarded_then_forced() {
    let (app, backends) = setup();
    let (order, _) = create_order(&app, &backends).await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/orders/{id}/status"),
        Some(json!({ "status": "DELIVERED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/orders/{id}/status"),
        Some(json!({ "status": "DELIVERED", "force": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DELIVERED");
    assert!(!body["delivered_at"].is_null());
}

#[tokio::test]
async fn test_cancel_guard_and_return_idempotency() {
    let (app, backends) = setup();
    let (order, user_id) = create_order(&app, &backends).await;
    let id = order["id"].as_str().unwrap().to_string();

    // Deliver (forced), then cancellation is rejected.
    send(
        &app,
        "PATCH",
        &format!("/orders/{id}/status"),
        Some(json!({ "status": "DELIVERED", "force": true })),
    )
    .await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{id}/cancel"),
        Some(json!({ "reason": "too late", "actor_id": user_id.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // First return succeeds, duplicate is rejected.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/orders/{id}/return"),
        Some(json!({ "reason": "wrong size", "user_id": user_id.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["return_requested"], true);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{id}/return"),
        Some(json!({ "reason": "again", "user_id": user_id.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_tracking_event_reconciles_order() {
    let (app, backends) = setup();
    let (order, user_id) = create_order(&app, &backends).await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/order-tracking",
        Some(json!({
            "order_id": id,
            "status": "SHIPPED",
            "carrier": "FedEx",
            "created_by": user_id.to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order_status"], "SHIPPED");
    assert_eq!(body["entry"]["carrier"], "FedEx");

    let (status, history) = send(
        &app,
        "GET",
        &format!("/order-tracking/{id}/history"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["entries"].as_array().unwrap().len(), 1);
    assert_eq!(history["current_status"], "SHIPPED");

    let (status, latest) =
        send(&app, "GET", &format!("/order-tracking/{id}/latest"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["status"], "SHIPPED");
}

#[tokio::test]
async fn test_tracking_latest_without_entries_is_404() {
    let (app, backends) = setup();
    let (order, _) = create_order(&app, &backends).await;
    let id = order["id"].as_str().unwrap();

    let (status, _) = send(&app, "GET", &format!("/order-tracking/{id}/latest"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tracking_ship_wrapper() {
    let (app, backends) = setup();
    let (order, user_id) = create_order(&app, &backends).await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/order-tracking/{id}/ship"),
        Some(json!({
            "carrier": "UPS",
            "tracking_number": "1Z999",
            "created_by": user_id.to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_status"], "SHIPPED");
    assert_eq!(body["entry"]["tracking_number"], "1Z999");
}

#[tokio::test]
async fn test_inventory_create_adjust_and_guard() {
    let (app, backends) = setup();
    let user_id = backends.users.insert_active("Ada", "ada@example.com");
    let product_id = uuid::Uuid::new_v4();
    let vendor_id = uuid::Uuid::new_v4();

    let (status, record) = send(
        &app,
        "POST",
        "/inventory",
        Some(json!({
            "product_id": product_id.to_string(),
            "vendor_id": vendor_id.to_string(),
            "current_stock": 100,
            "low_stock_threshold": 20,
            "created_by": user_id.to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["available_stock"], 100);

    // Duplicate pair is rejected.
    let (status, _) = send(
        &app,
        "POST",
        "/inventory",
        Some(json!({
            "product_id": product_id.to_string(),
            "vendor_id": vendor_id.to_string(),
            "current_stock": 1,
            "created_by": user_id.to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = record["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/inventory/{id}/adjust-stock"),
        Some(json!({
            "quantity": 85,
            "type": "OUT",
            "reason": "flash sale",
            "updated_by": user_id.to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_stock"], 15);
    assert_eq!(body["is_low_stock"], true);
    assert_eq!(body["is_out_of_stock"], false);

    // Overdraw is rejected and leaves stock unchanged.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/inventory/{id}/adjust-stock"),
        Some(json!({
            "quantity": 50,
            "type": "OUT",
            "reason": "oversell",
            "updated_by": user_id.to_string(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, low) = send(&app, "GET", "/inventory/low-stock", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bulk_import_multipart_with_per_row_results() {
    let (app, backends) = setup();
    let user_id = backends.users.insert_active("Ada", "ada@example.com");
    let vendor_id = uuid::Uuid::new_v4();
    let good_a = uuid::Uuid::new_v4();
    let good_b = uuid::Uuid::new_v4();

    let csv = format!(
        "product_id,current_stock,reserved_stock,low_stock_threshold,notes\n\
         {good_a},50,5,10,first batch\n\
         not-a-uuid,10,0,5,\n\
         {good_b},30,0,5,\n"
    );

    let boundary = "bulk-import-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"vendor_id\"\r\n\r\n{vendor_id}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"created_by\"\r\n\r\n{user_id}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"notes\"\r\n\r\nimported\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"stock.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inventory/bulk-import")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let imported = json["imported"].as_array().unwrap();
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[0]["available_stock"], 45);
    assert_eq!(imported[0]["stock_notes"], "first batch");
    assert_eq!(imported[1]["stock_notes"], "imported");

    let failures = json["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["row"], 1);
}

#[tokio::test]
async fn test_stats_endpoints() {
    let (app, backends) = setup();
    let (order, user_id) = create_order(&app, &backends).await;
    let id = order["id"].as_str().unwrap().to_string();

    send(
        &app,
        "POST",
        "/order-tracking",
        Some(json!({
            "order_id": id,
            "status": "SHIPPED",
            "created_by": user_id.to_string(),
        })),
    )
    .await;

    let (status, stats) = send(&app, "GET", "/orders/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_orders"], 1);

    let (status, stats) = send(&app, "GET", "/order-tracking/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let shipped = stats["by_status"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["status"] == "SHIPPED")
        .unwrap();
    assert_eq!(shipped["orders"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
