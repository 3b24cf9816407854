//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::mixer_id::MAX_MIXER_ID;
use crate::core::planner::plan_workbook;
use crate::core::session::{CommitOutcome, PlanSnapshot};
use crate::error::MixerError;
use crate::excel::importer::{TableSummary, WorkbookImporter};
use crate::types::{DischargeOrder, MixerPlan};

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

/// HTTP status for a planner error
pub fn status_for(err: &MixerError) -> StatusCode {
    match err {
        MixerError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        MixerError::Io(_) | MixerError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        MixerError::Zip(_)
        | MixerError::Xml { .. }
        | MixerError::MissingEntry(_)
        | MixerError::TableNotFound(_)
        | MixerError::Config(_)
        | MixerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn mixer_failure(err: MixerError) -> Response {
    warn!(error = %err, "request failed");
    failure(status_for(&err), err.to_string())
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Mixer API Server".to_string(),
        version: state.version.clone(),
        description: "Feedlot mixer load and discharge planning from .xlsx workbooks".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("POST", "/api/v1/extract", "Locate Formula / Comida tables"),
            EndpointInfo::new("POST", "/api/v1/plan", "Plan loads and discharges per mixer"),
            EndpointInfo::new("GET", "/api/v1/plan/latest", "Most recent committed plan"),
            EndpointInfo::new("POST", "/api/v1/order", "Set a mixer's discharge order"),
            EndpointInfo::new("POST", "/api/v1/order/move", "Move one pen in a mixer's route"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec![
            "extract".to_string(),
            "plan".to_string(),
            "order".to_string(),
        ],
    }))
}

/// Extract request
#[derive(Deserialize)]
pub struct ExtractRequest {
    pub file_path: String,
    /// Overrides the configured header scan depth
    #[serde(default)]
    pub header_scan_rows: Option<usize>,
}

/// Extract response
#[derive(Serialize, Default)]
pub struct ExtractResponse {
    pub file_path: String,
    pub sheets: Vec<String>,
    pub tables: Vec<TableSummary>,
}

/// POST /api/v1/extract - Locate the planner tables in a workbook
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let path = PathBuf::from(&req.file_path);
    let rows = req.header_scan_rows.unwrap_or(state.config.header_scan_rows);
    if rows == 0 {
        return failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "header_scan_rows must be at least 1",
        );
    }

    let result = tokio::task::spawn_blocking(move || {
        WorkbookImporter::open(&path)?
            .with_header_scan_rows(rows)
            .extract()
    })
    .await;

    match result {
        Ok(Ok(extraction)) => Json(ApiResponse::ok(ExtractResponse {
            file_path: req.file_path,
            sheets: extraction.sheet_names.clone(),
            tables: extraction.summaries(),
        }))
        .into_response(),
        Ok(Err(e)) => mixer_failure(e),
        Err(e) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("extraction task failed: {}", e),
        ),
    }
}

/// Plan request
#[derive(Deserialize)]
pub struct PlanRequest {
    pub file_path: String,
    /// Discharge order hints for this request, over the server configuration
    #[serde(default)]
    pub discharge_order: Option<DischargeOrder>,
}

/// Plan response
#[derive(Serialize)]
pub struct PlanResponse {
    pub ticket: u64,
    pub file_path: String,
    pub plan: MixerPlan,
    pub order: DischargeOrder,
    pub messages: Vec<String>,
}

impl From<&PlanSnapshot> for PlanResponse {
    fn from(snapshot: &PlanSnapshot) -> Self {
        Self {
            ticket: snapshot.ticket.id(),
            file_path: snapshot.source.clone(),
            plan: snapshot.plan.clone(),
            order: snapshot.order.clone(),
            messages: snapshot.messages.clone(),
        }
    }
}

/// POST /api/v1/plan - Extract, plan and publish
pub async fn plan(State(state): State<Arc<AppState>>, Json(req): Json<PlanRequest>) -> Response {
    let ticket = state.session.begin();
    let config = match &req.discharge_order {
        Some(order) => state.config.clone().with_order(order),
        None => state.config.clone(),
    };
    let path = PathBuf::from(&req.file_path);

    let result = tokio::task::spawn_blocking(move || plan_workbook(&path, &config)).await;
    let report = match result {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => return mixer_failure(e),
        Err(e) => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("planning task failed: {}", e),
            )
        }
    };

    let snapshot = report.into_snapshot(req.file_path, ticket);
    let response = PlanResponse::from(&snapshot);
    match state.session.commit(ticket, snapshot) {
        CommitOutcome::Committed => {
            info!(ticket = ticket.id(), mixers = response.plan.mixers.len(), "plan committed");
            Json(ApiResponse::ok(response)).into_response()
        }
        CommitOutcome::Superseded => failure(
            StatusCode::CONFLICT,
            "superseded by a newer plan request",
        ),
    }
}

/// GET /api/v1/plan/latest - Most recent committed plan
pub async fn latest_plan(State(state): State<Arc<AppState>>) -> Response {
    match state.session.latest() {
        Some(snapshot) => Json(ApiResponse::ok(PlanResponse::from(&snapshot))).into_response(),
        None => failure(StatusCode::NOT_FOUND, "no plan has been computed yet"),
    }
}

/// Order request
#[derive(Deserialize)]
pub struct OrderRequest {
    pub mixer: u32,
    pub pens: Vec<String>,
}

/// Order response
#[derive(Serialize)]
pub struct OrderResponse {
    pub mixer: u32,
    pub pens: Vec<String>,
    pub plan: MixerPlan,
}

/// POST /api/v1/order - Replace a mixer's discharge order and re-plan
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> Response {
    if req.mixer == 0 || req.mixer > MAX_MIXER_ID {
        return failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("mixer must be between 1 and {}", MAX_MIXER_ID),
        );
    }

    match state.session.reorder(req.mixer, req.pens.clone()) {
        Some(plan) => Json(ApiResponse::ok(OrderResponse {
            mixer: req.mixer,
            pens: req.pens,
            plan,
        }))
        .into_response(),
        None => failure(StatusCode::NOT_FOUND, "no plan has been computed yet"),
    }
}

/// Move request
#[derive(Deserialize)]
pub struct MoveRequest {
    pub mixer: u32,
    pub from: usize,
    pub to: usize,
}

/// Move response
#[derive(Serialize)]
pub struct MoveResponse {
    pub mixer: u32,
    pub from: usize,
    pub to: usize,
    pub plan: MixerPlan,
}

/// POST /api/v1/order/move - Move one pen within a mixer's discharge order
pub async fn move_pen(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MoveRequest>,
) -> Response {
    if state.session.latest().is_none() {
        return failure(StatusCode::NOT_FOUND, "no plan has been computed yet");
    }
    match state.session.move_pen(req.mixer, req.from, req.to) {
        Some(plan) => Json(ApiResponse::ok(MoveResponse {
            mixer: req.mixer,
            from: req.from,
            to: req.to,
            plan,
        }))
        .into_response(),
        None => failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "mixer {} has no pen at position {} or {}",
                req.mixer, req.from, req.to
            ),
        ),
    }
}
