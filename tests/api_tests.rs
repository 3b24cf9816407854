//! API integration tests
//!
//! Requests go through the full router (CORS + trace layers) with
//! `tower::ServiceExt::oneshot`; no socket is bound.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::standard_workbook;
use feedlot_mixer::api::handlers::ApiResponse;
use feedlot_mixer::api::server::{router, ApiConfig, AppState};
use feedlot_mixer::config::PlanConfig;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(PlanConfig::default()));
    (router(Arc::clone(&state)), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_default() {
    let config = ApiConfig::default();
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
}

#[test]
fn test_api_response_err_has_no_data() {
    let response: ApiResponse<()> = ApiResponse::err("boom");
    assert!(!response.success);
    assert!(response.data.is_none());
    assert_eq!(response.error.as_deref(), Some("boom"));
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["request_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let paths: Vec<&str> = body["data"]["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/api/v1/plan"));
    assert!(paths.contains(&"/api/v1/order"));
}

#[tokio::test]
async fn test_version() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_extract_reports_tables() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let (app, _) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/extract",
        Some(json!({ "file_path": path.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tables = body["data"]["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 3);
    assert_eq!(tables[0]["target"], "Formula");
    assert_eq!(tables[0]["found"], true);
    assert_eq!(tables[0]["strategy"], "table_definition");
    assert_eq!(tables[1]["rows"], 3);
    assert_eq!(tables[2]["found"], false);
}

#[tokio::test]
async fn test_extract_missing_file_is_404() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/extract",
        Some(json!({ "file_path": "/nonexistent/raciones.xlsx" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// PLAN / LATEST / ORDER
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_latest_before_any_plan() {
    let (app, _) = app();
    let (status, _) = send(&app, "GET", "/api/v1/plan/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_then_latest_then_reorder() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let (app, state) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/plan",
        Some(json!({ "file_path": path.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mixer = &body["data"]["plan"]["mixers"][0];
    assert_eq!(mixer["mixer"], 1);
    assert_eq!(mixer["total_kg"], 350.0);
    assert_eq!(mixer["discharges"][0]["corral"], "C1");
    let ticket = body["data"]["ticket"].clone();

    let (status, body) = send(&app, "GET", "/api/v1/plan/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ticket"], ticket);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/order",
        Some(json!({ "mixer": 1, "pens": ["C2", "C1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let discharges = &body["data"]["plan"]["mixers"][0]["discharges"];
    assert_eq!(discharges[0]["corral"], "C2");
    assert_eq!(discharges[0]["remaining_kg"], 250.0);

    let snapshot = state.session.latest().unwrap();
    assert_eq!(snapshot.order.get(1).unwrap(), ["C2", "C1"]);
}

#[tokio::test]
async fn test_plan_with_request_order() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let (app, _) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/plan",
        Some(json!({
            "file_path": path.display().to_string(),
            "discharge_order": { "1": ["C2", "C1"] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["plan"]["mixers"][0]["discharges"][0]["corral"],
        "C2"
    );
}

#[tokio::test]
async fn test_newer_run_invalidates_committed_ticket() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let (app, state) = app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/plan",
        Some(json!({ "file_path": path.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let committed = state.session.latest().unwrap().ticket;

    // a run started after the request; the committed ticket is no longer current
    let newer = state.session.begin();
    assert!(newer > committed);
    assert!(!state.session.is_current(committed));
}

#[tokio::test]
async fn test_move_pen_in_route() {
    let dir = TempDir::new().unwrap();
    let path = standard_workbook().write(dir.path(), "raciones.xlsx");
    let (app, _) = app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/plan",
        Some(json!({ "file_path": path.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/order/move",
        Some(json!({ "mixer": 1, "from": 1, "to": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let discharges = &body["data"]["plan"]["mixers"][0]["discharges"];
    assert_eq!(discharges[0]["corral"], "C2");
    assert_eq!(discharges[1]["corral"], "C1");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/order/move",
        Some(json!({ "mixer": 1, "from": 0, "to": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_order_rejects_invalid_mixer() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/order",
        Some(json!({ "mixer": 0, "pens": ["C1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_order_without_plan_is_404() {
    let (app, _) = app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/order",
        Some(json!({ "mixer": 1, "pens": ["C1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_on_non_workbook_is_422() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raciones.xlsx");
    std::fs::write(&path, b"plain text").unwrap();
    let (app, _) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/plan",
        Some(json!({ "file_path": path.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("archive"));
}
