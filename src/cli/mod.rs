//! CLI command handlers

pub mod commands;

pub use commands::{extract, load_config, normalize, plan, watch};
