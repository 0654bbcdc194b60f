//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
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

fn setup() -> Router {
    let gateway = api::create_gateway(InMemoryEventStore::new(), api::default_catalog(), Tz::UTC);
    api::create_app(gateway, get_metrics_handle())
}

const ADMIN: (&str, &str) = ("manager", "ADMIN");
const ALICE: (&str, &str) = ("alice", "USER");
const BOB: (&str, &str) = ("bob", "USER");

/// Sends a request and returns the status with the body as JSON, or as a
/// JSON string when the body is plain text.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        request = request.header("x-user-id", id).header("x-user-role", role);
    }
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn create_table(app: &Router, number: u32, capacity: u32) -> String {
    let (status, table) = send(
        app,
        "POST",
        "/admin/tables",
        Some(ADMIN),
        Some(json!({ "number": number, "capacity": capacity })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    table["id"].as_str().unwrap().to_string()
}

async fn place_order(app: &Router, caller: (&str, &str), table_id: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/orders",
        Some(caller),
        Some(json!({
            "table_id": table_id,
            "guest_count": 2,
            "items": [
                { "product_id": "ca-phe-sua-da", "quantity": 2 },
                { "product_id": "banh-mi", "quantity": 1 }
            ]
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_products_are_public() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/tables", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");

    let (status, _) = send(&app, "GET", "/tables", Some(("alice", "WIZARD")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_table_administration() {
    let app = setup();

    let (status, json) = send(
        &app,
        "POST",
        "/admin/tables",
        Some(ALICE),
        Some(json!({ "number": 1, "capacity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");

    let table_id = create_table(&app, 1, 4).await;

    let (status, json) = send(
        &app,
        "POST",
        "/admin/tables",
        Some(ADMIN),
        Some(json!({ "number": 1, "capacity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/admin/tables/{table_id}/status"),
        Some(ADMIN),
        Some(json!({ "status": "RESERVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "RESERVED");
    assert_eq!(json["reserved_by"], "manager");

    let (status, json) = send(&app, "GET", "/tables", Some(BOB), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["number"], 1);
    assert!(json[0].get("reserved_by").is_none());
}

#[tokio::test]
async fn test_reservation_flow() {
    let app = setup();
    let table_id = create_table(&app, 7, 4).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/tables/{table_id}/reserve"),
        Some(ALICE),
        Some(json!({ "guest_hint": 3, "note": "by the window" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "RESERVED");
    assert_eq!(json["note"], "by the window");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/tables/{table_id}/reserve"),
        Some(BOB),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = place_order(&app, BOB, &table_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (status, json) = place_order(&app, ALICE, &table_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["fulfillment_status"], "PENDING");
    assert_eq!(json["payment_status"], "UNPAID");
    assert_eq!(json["total"], 93000);

    let (_, mine) = send(&app, "GET", "/tables/my", Some(ALICE), None).await;
    assert_eq!(mine[0]["status"], "OCCUPIED");
    assert_eq!(mine[0]["current_order_id"], json["id"]);
}

#[tokio::test]
async fn test_order_lifecycle_and_reports() {
    let app = setup();
    let table_id = create_table(&app, 3, 4).await;
    let (_, order) = place_order(&app, ALICE, &table_id).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let action = |name: &str| format!("/admin/orders/{order_id}/{name}");

    let (status, json) = send(&app, "POST", &action("confirm"), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");

    let (status, _) = send(&app, "POST", &action("confirm"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "POST", &action("ready"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "invalid_transition");

    let (status, json) = send(&app, "POST", &action("settle"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fulfillment_status"], "SERVED");
    assert_eq!(json["payment_status"], "PAID");
    assert!(json["paid_at"].is_string());

    let (status, json) = send(&app, "POST", &action("pay"), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "already_paid");

    let (_, tables) = send(&app, "GET", "/admin/tables", Some(ADMIN), None).await;
    assert_eq!(tables[0]["status"], "AVAILABLE");

    let (status, report) = send(&app, "GET", "/admin/reports/daily", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["orders_count"], 1);
    assert_eq!(report["total_revenue"], 93000);
    assert_eq!(report["guests"], 2);
    assert_eq!(report["timezone"], "UTC");

    let today = Utc::now().date_naive();
    let (status, top) = send(
        &app,
        "GET",
        &format!(
            "/admin/reports/top-products?start={}&end={}&limit=1",
            today - Duration::days(1),
            today + Duration::days(1)
        ),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let products = top["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["product_id"], "ca-phe-sua-da");
    assert_eq!(products[0]["revenue"], 58000);

    let (status, _) = send(&app, "GET", "/admin/reports/daily", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_report_input_validation() {
    let app = setup();
    let today = Utc::now().date_naive();

    let (status, json) = send(
        &app,
        "GET",
        &format!(
            "/admin/reports/range?start={}&end={}",
            today,
            today - Duration::days(2)
        ),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");

    let (status, json) = send(
        &app,
        "GET",
        "/admin/reports/daily?tz=Mars/Olympus",
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");

    let (status, json) = send(
        &app,
        "GET",
        &format!("/admin/reports/range?start={today}&end={today}&tz=Asia/Ho_Chi_Minh"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["timezone"], "Asia/Ho_Chi_Minh");
    assert_eq!(json["orders_count"], 0);
}

#[tokio::test]
async fn test_cancel_frees_table() {
    let app = setup();
    let table_id = create_table(&app, 2, 2).await;
    let (_, order) = place_order(&app, ALICE, &table_id).await;
    let order_id = order["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        "POST",
        &format!("/admin/orders/{order_id}/cancel"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fulfillment_status"], "CANCELLED");

    let (status, json) = send(
        &app,
        "POST",
        &format!("/admin/orders/{order_id}/pay"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "invalid_transition");

    let (_, open) = send(&app, "GET", "/admin/orders?only_open=true", Some(ADMIN), None).await;
    assert!(open.as_array().unwrap().is_empty());

    let (_, history) = send(
        &app,
        "GET",
        &format!("/admin/tables/{table_id}/orders"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (status, _) = place_order(&app, BOB, &table_id).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_release_requires_force_for_open_order() {
    let app = setup();
    let table_id = create_table(&app, 4, 4).await;
    place_order(&app, ALICE, &table_id).await;

    let release = format!("/tables/{table_id}/release");
    let (status, _) = send(&app, "POST", &release, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&app, "POST", &release, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (status, json) = send(
        &app,
        "POST",
        &format!("{release}?force=true"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_orders_are_private() {
    let app = setup();
    let table_id = create_table(&app, 5, 4).await;
    let (_, order) = place_order(&app, ALICE, &table_id).await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, _) = send(&app, "GET", &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, mine) = send(&app, "GET", "/orders/my", Some(BOB), None).await;
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_validation() {
    let app = setup();
    let table_id = create_table(&app, 6, 2).await;

    let (status, json) = send(
        &app,
        "POST",
        "/orders",
        Some(ALICE),
        Some(json!({ "table_id": table_id, "guest_count": 1, "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");

    let (status, json) = send(
        &app,
        "POST",
        "/orders",
        Some(ALICE),
        Some(json!({
            "table_id": table_id,
            "guest_count": 1,
            "items": [{ "product_id": "pizza", "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_invalid_id_format() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/orders/not-a-uuid", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn test_backfill_reports_count() {
    let app = setup();

    let (status, body) = send(
        &app,
        "POST",
        "/admin/maintenance/backfill-paid-at",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) = send(
        &app,
        "POST",
        "/admin/maintenance/backfill-paid-at",
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("fixed=0".to_string()));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    send(&app, "GET", "/products", None, None).await;

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
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}
