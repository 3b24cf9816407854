//! End-to-end planning: located tables → ration rows → mixer plan

use crate::config::PlanConfig;
use crate::core::aggregator;
use crate::core::formula::InclusionTable;
use crate::core::mixer_id::{normalize_mixer, MixerInput};
use crate::core::rations::RationTable;
use crate::core::session::{PlanSnapshot, Ticket};
use crate::core::synonyms::{HeaderMap, RationField};
use crate::error::{MixerError, MixerResult};
use crate::excel::importer::{WorkbookExtraction, WorkbookImporter};
use crate::types::{DischargeOrder, ExtractedTable, MixerAggregate, MixerPlan};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Everything derived from one workbook
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub rations: RationTable,
    pub inclusion: InclusionTable,
    pub aggregates: BTreeMap<u32, MixerAggregate>,
    /// Effective discharge hints, seeded with the default route of every mixer
    pub order: DischargeOrder,
    pub plan: MixerPlan,
    /// Non-fatal findings worth showing to the user
    pub messages: Vec<String>,
}

impl PlanReport {
    /// Session snapshot of this report
    pub fn into_snapshot(self, source: impl Into<String>, ticket: Ticket) -> PlanSnapshot {
        PlanSnapshot {
            ticket,
            source: source.into(),
            rows: self.rations.rows,
            inclusion: self.inclusion,
            order: self.order,
            plan: self.plan,
            messages: self.messages,
        }
    }
}

/// Discharge hints authored in the workbook: pens in row order per mixer
pub fn order_from_table(
    table: &ExtractedTable,
    extra_synonyms: &HashMap<RationField, Vec<String>>,
) -> DischargeOrder {
    let map = HeaderMap::resolve(&table.headers, extra_synonyms);
    let mut order = DischargeOrder::new();
    let (Some(corral_col), Some(mixer_col)) =
        (map.column(RationField::Corral), map.column(RationField::Mixer))
    else {
        warn!(table = %table.table_name, "discharge order table lacks Corral or MIXER column");
        return order;
    };

    for row in &table.rows {
        let Some(pen) = row
            .cell(corral_col)
            .map(|c| c.display().trim().to_string())
            .filter(|p| !p.is_empty())
        else {
            continue;
        };
        let Some(mixer) = row
            .cell(mixer_col)
            .and_then(|c| normalize_mixer(&MixerInput::from_cell(c)).id())
        else {
            continue;
        };
        let mut pens = order.get(mixer).map(<[String]>::to_vec).unwrap_or_default();
        if !pens.contains(&pen) {
            pens.push(pen);
        }
        order.set(mixer, pens);
    }
    order
}

/// Build the plan from an extraction
///
/// Fails only when there is no Comida table to plan from. A missing Formula
/// table leaves ingredient loads empty and is reported in `messages`.
pub fn build_plan(extraction: &WorkbookExtraction, config: &PlanConfig) -> MixerResult<PlanReport> {
    let mut messages = Vec::new();

    let comida = match &extraction.comida {
        Ok(table) => table,
        Err(MixerError::TableNotFound(name)) => {
            return Err(MixerError::TableNotFound(name.clone()))
        }
        Err(e) => return Err(MixerError::Validation(format!("Comida table unreadable: {}", e))),
    };

    let inclusion = match &extraction.formula {
        Ok(table) => InclusionTable::from_table(table),
        Err(e) => {
            messages.push(e.to_string());
            InclusionTable::default()
        }
    };

    let mut order = match &extraction.discharge_order {
        Ok(table) => order_from_table(table, &config.extra_synonyms),
        Err(MixerError::TableNotFound(_)) => DischargeOrder::new(),
        Err(e) => {
            messages.push(format!("discharge order ignored: {}", e));
            DischargeOrder::new()
        }
    };
    order.merge(&config.discharge_order);

    let rations = RationTable::from_table(comida, &config.extra_synonyms);
    if !rations.header_map.contains(RationField::Corral) {
        messages.push(format!(
            "no Corral column among headers of '{}'",
            comida.table_name
        ));
    }
    let unassigned = rations.rows.iter().filter(|r| !r.mixer.is_assigned()).count();
    if unassigned > 0 {
        messages.push(format!("{} pen row(s) without a mixer", unassigned));
    }

    let aggregates = aggregator::aggregate(&rations.rows, &inclusion);
    let plan = aggregator::plan_from_aggregates(
        &rations.rows,
        &aggregates,
        &inclusion.insumo_order,
        &order,
    );
    order.seed_defaults(&plan);

    info!(
        rows = rations.len(),
        mixers = plan.mixers.len(),
        insumos = inclusion.insumo_order.len(),
        "plan built"
    );

    Ok(PlanReport {
        rations,
        inclusion,
        aggregates,
        order,
        plan,
        messages,
    })
}

/// Open, extract and plan a workbook file
pub fn plan_workbook<P: AsRef<Path>>(path: P, config: &PlanConfig) -> MixerResult<PlanReport> {
    let extraction = WorkbookImporter::open(path)?
        .with_header_scan_rows(config.header_scan_rows)
        .extract()?;
    build_plan(&extraction, config)
}
