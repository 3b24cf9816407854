//! Mixer API Server binary
//!
//! HTTP REST API for the feedlot mixer planner.
//! Provides extract, plan and discharge order endpoints.

use std::path::PathBuf;

use clap::Parser;
use feedlot_mixer::api::{run_api_server, ApiConfig};
use feedlot_mixer::config::PlanConfig;

#[derive(Parser, Debug)]
#[command(name = "mixer-server")]
#[command(version)]
#[command(about = "Mixer API Server - HTTP REST API for feedlot mixer planning")]
#[command(long_about = r#"
Mixer API Server - HTTP REST API

Provides RESTful endpoints over the planner:
  - POST /api/v1/extract     - Locate Formula / Comida tables in a workbook
  - POST /api/v1/plan        - Plan loads and discharges per mixer
  - GET  /api/v1/plan/latest - Most recent committed plan
  - POST /api/v1/order       - Set a mixer's discharge order and re-plan
  - POST /api/v1/order/move  - Move one pen within a mixer's route

Additional endpoints:
  - GET  /health             - Health check
  - GET  /version            - Server version info
  - GET  /                   - API documentation

Features:
  - CORS enabled for cross-origin requests
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs
  - Overlapping plan requests: only the newest one is published

Example usage:
  mixer-server                           # Start on localhost:8080
  mixer-server --host 0.0.0.0 --port 3000 --config planner.yaml

  curl -X POST http://localhost:8080/api/v1/plan \
    -H "Content-Type: application/json" \
    -d '{"file_path": "raciones.xlsx"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "MIXER_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "MIXER_PORT")]
    port: u16,

    /// Planner configuration (YAML)
    #[arg(short, long, env = "MIXER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let plan = match args.config {
        Some(path) => PlanConfig::load(path)?,
        None => PlanConfig::default(),
    };

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        plan,
    };

    run_api_server(config).await
}
