//! Mixer API Server implementation
//!
//! HTTP REST API server using Axum. Extraction runs on the blocking pool and
//! publishes through a shared [`PlanSession`], so a slow request that is
//! overtaken by a newer one never replaces the newer plan.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::handlers;
use crate::config::PlanConfig;
use crate::core::session::PlanSession;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Planner settings applied to every request
    pub plan: PlanConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            plan: PlanConfig::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub config: PlanConfig,
    pub session: PlanSession,
}

impl AppState {
    pub fn new(config: PlanConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            session: PlanSession::new(),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route("/api/v1/extract", post(handlers::extract))
        .route("/api/v1/plan", post(handlers::plan))
        .route("/api/v1/plan/latest", get(handlers::latest_plan))
        .route("/api/v1/order", post(handlers::reorder))
        .route("/api/v1/order/move", post(handlers::move_pen))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    // Initialize tracing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mixer_server=info,feedlot_mixer=info,tower_http=info".into()
            }),
        )
        .try_init();

    config.plan.validate()?;
    let state = Arc::new(AppState::new(config.plan));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🚜 Mixer API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/extract, /api/v1/plan, /api/v1/plan/latest, /api/v1/order, /api/v1/order/move");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Mixer API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
