//! Ration reconciliation and mixer planning engine

pub mod aggregator;
pub mod formula;
pub mod mixer_id;
pub mod numeric;
pub mod planner;
pub mod rations;
pub mod session;
pub mod stage;
pub mod synonyms;
pub mod text;

pub use formula::InclusionTable;
pub use mixer_id::{normalize_mixer, normalize_mixer_str, MixerInput};
pub use planner::{build_plan, plan_workbook, PlanReport};
pub use rations::RationTable;
pub use session::{CommitOutcome, PlanSession, Ticket};
pub use synonyms::{HeaderMap, RationField};
