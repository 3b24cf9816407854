//! Feedlot mixer planner
//!
//! Reads a feeding workbook (`.xlsx`), locates the diet inclusion table
//! ("Formula") and the daily ration table ("Comida"), reconciles their
//! headers and mixer assignments, and derives per mixer the ingredient load
//! sequence and the pen discharge route.
//!
//! # Features
//!
//! - Self-contained `.xlsx` reader (shared strings, styles, merged cells)
//! - Table discovery by table definition or by header heuristics
//! - Header synonym reconciliation and mixer identifier normalisation
//! - Mixer gap filling over messy ration sheets
//! - Load/discharge planning with user discharge-order hints
//!
//! # Example
//!
//! ```no_run
//! use feedlot_mixer::config::PlanConfig;
//! use feedlot_mixer::core::plan_workbook;
//!
//! let report = plan_workbook("raciones.xlsx", &PlanConfig::default())?;
//! for route in &report.plan.mixers {
//!     println!("Mixer {}: {:.0} kg", route.mixer, route.total_kg);
//! }
//! # Ok::<(), feedlot_mixer::error::MixerError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use error::{MixerError, MixerResult};
pub use types::{DischargeOrder, ExtractedTable, MixerAssignment, MixerPlan, RationRow, Stage};
