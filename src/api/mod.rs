//! Mixer API Server module
//!
//! Provides an HTTP REST API over the planner.
//! Run with `mixer-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
