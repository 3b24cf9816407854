//! Planner configuration file (YAML)
//!
//! ```yaml
//! header_scan_rows: 40
//! extra_synonyms:
//!   Corral: [Lote, Potrero]
//!   MIXER: [Mixer asignado]
//! discharge_order:
//!   1: [C4, C2, C1]
//! ```

use crate::core::synonyms::RationField;
use crate::error::{MixerError, MixerResult};
use crate::excel::locator::DEFAULT_HEADER_SCAN_ROWS;
use crate::types::DischargeOrder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    /// Leading rows inspected when looking for a header without a table definition
    pub header_scan_rows: usize,
    /// Additional header spellings per canonical field
    pub extra_synonyms: HashMap<RationField, Vec<String>>,
    /// Discharge order hints; override any order authored in the workbook
    pub discharge_order: DischargeOrder,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            extra_synonyms: HashMap::new(),
            discharge_order: DischargeOrder::new(),
        }
    }
}

impl PlanConfig {
    pub fn from_yaml(text: &str) -> MixerResult<Self> {
        let config: PlanConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> MixerResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> MixerResult<()> {
        if self.header_scan_rows == 0 {
            return Err(MixerError::Validation(
                "header_scan_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay hints loaded from a standalone order file
    pub fn with_order(mut self, order: &DischargeOrder) -> Self {
        self.discharge_order.merge(order);
        self
    }
}

/// Load a standalone discharge order file (`mixer: [pen, ...]`)
pub fn load_order<P: AsRef<Path>>(path: P) -> MixerResult<DischargeOrder> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(serde_yaml::from_str(&text)?)
}
