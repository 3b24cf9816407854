//! Mixer aggregation engine
//!
//! Pure functions from ration rows, inclusion fractions and discharge-order
//! hints to per-mixer totals, load sequences and discharge routes. Nothing is
//! patched incrementally: any input change means calling [`plan`] again.

use crate::core::formula::InclusionTable;
use crate::core::rations::pen_key;
use crate::core::stage::stage_of;
use crate::types::{
    DischargeOrder, DischargeStop, LoadStep, MixerAggregate, MixerPlan, MixerRoute, RationRow,
    Stage,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Feeding rounds per day; each round carries half the daily ration
pub const ROUNDS_PER_DAY: f64 = 2.0;

/// Mass delivered to a pen in one round
pub fn kg_ronda(row: &RationRow) -> f64 {
    row.cab as f64 * row.kg_tc_dia * row.ajuste / 100.0 / ROUNDS_PER_DAY
}

/// Formula rows that describe the ration rather than an ingredient
pub fn is_formula_metadata(label: &str) -> bool {
    let low = label.trim().to_lowercase();
    low == "total" || low.starts_with("% ms") || low.starts_with("% mv")
}

/// Labels that never go into the mixer
pub fn is_loadable(label: &str) -> bool {
    let low = label.trim().to_lowercase();
    !(is_formula_metadata(&low) || matches!(low.as_str(), "codigo" | "código" | "dieta"))
}

/// A ration row that takes part in aggregation
struct Routed<'a> {
    mixer: u32,
    stage: Stage,
    kg: f64,
    row: &'a RationRow,
}

/// Rows with a mixer, a known stage and a positive round mass
fn routed(rows: &[RationRow]) -> impl Iterator<Item = Routed<'_>> {
    rows.iter().filter_map(|row| {
        let mixer = row.mixer.id()?;
        let stage = stage_of(&row.etapa);
        let kg = kg_ronda(row);
        (stage != Stage::Default && kg > 0.0).then_some(Routed {
            mixer,
            stage,
            kg,
            row,
        })
    })
}

/// Total and per-ingredient mass of every mixer
pub fn aggregate(rows: &[RationRow], inclusion: &InclusionTable) -> BTreeMap<u32, MixerAggregate> {
    let mut mixers: BTreeMap<u32, MixerAggregate> = BTreeMap::new();

    for entry in routed(rows) {
        let agg = mixers
            .entry(entry.mixer)
            .or_insert_with(|| MixerAggregate::new(entry.mixer));
        agg.total_kg += entry.kg;
        for inc in inclusion.inclusions(entry.stage) {
            if is_formula_metadata(&inc.insumo) {
                continue;
            }
            *agg.insumos_kg.entry(inc.insumo.clone()).or_insert(0.0) += entry.kg * inc.fraction;
        }
    }

    mixers
}

/// Pens served by `mixer`, hinted pens first, with the running balance
///
/// Rows of the same pen are merged. The balance starts at `total_kg` and
/// never goes below zero.
pub fn discharge_route(
    mixer: u32,
    rows: &[RationRow],
    hints: Option<&[String]>,
    total_kg: f64,
) -> Vec<DischargeStop> {
    let mut pens: Vec<(String, DischargeStop)> = Vec::new();
    for entry in routed(rows).filter(|e| e.mixer == mixer) {
        let key = pen_key(&entry.row.corral);
        match pens.iter_mut().find(|(k, _)| *k == key) {
            Some((_, stop)) => stop.kg += entry.kg,
            None => pens.push((
                key,
                DischargeStop {
                    corral: entry.row.corral.clone(),
                    stage: entry.stage,
                    kg: entry.kg,
                    remaining_kg: 0.0,
                },
            )),
        }
    }

    let mut ordered: Vec<DischargeStop> = Vec::with_capacity(pens.len());
    for hint in hints.unwrap_or_default() {
        let key = pen_key(hint);
        if let Some(pos) = pens.iter().position(|(k, _)| *k == key) {
            ordered.push(pens.remove(pos).1);
        }
    }
    ordered.extend(pens.into_iter().map(|(_, stop)| stop));

    let mut balance = total_kg;
    for stop in &mut ordered {
        balance = (balance - stop.kg).max(0.0);
        stop.remaining_kg = balance;
    }
    ordered
}

/// Most frequent stage among the stops; ties go to the first one seen
pub fn dominant_stage(stops: &[DischargeStop]) -> Stage {
    let mut counts: Vec<(Stage, usize)> = Vec::new();
    for stop in stops {
        match counts.iter_mut().find(|(s, _)| *s == stop.stage) {
            Some((_, n)) => *n += 1,
            None => counts.push((stop.stage, 1)),
        }
    }
    let mut best: Option<(Stage, usize)> = None;
    for (stage, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((stage, n));
        }
    }
    best.map_or(Stage::Default, |(stage, _)| stage)
}

/// Ingredients to load, in formula order, with the cumulative mass
pub fn load_sequence(aggregate: &MixerAggregate, insumo_order: &[String]) -> Vec<LoadStep> {
    let mut cumulative = 0.0;
    insumo_order
        .iter()
        .filter(|insumo| is_loadable(insumo))
        .filter_map(|insumo| {
            let kg = *aggregate.insumos_kg.get(insumo)?;
            if kg <= 0.0 {
                return None;
            }
            cumulative += kg;
            Some(LoadStep {
                insumo: insumo.clone(),
                kg,
                cumulative_kg: cumulative,
            })
        })
        .collect()
}

/// Full plan: one route per mixer, ascending mixer number
pub fn plan(rows: &[RationRow], inclusion: &InclusionTable, hints: &DischargeOrder) -> MixerPlan {
    plan_from_aggregates(rows, &aggregate(rows, inclusion), &inclusion.insumo_order, hints)
}

/// Routes over aggregates already computed from `rows`
pub fn plan_from_aggregates(
    rows: &[RationRow],
    aggregates: &BTreeMap<u32, MixerAggregate>,
    insumo_order: &[String],
    hints: &DischargeOrder,
) -> MixerPlan {
    let mixers: Vec<MixerRoute> = aggregates
        .values()
        .map(|agg| {
            let discharges = discharge_route(agg.mixer, rows, hints.get(agg.mixer), agg.total_kg);
            MixerRoute {
                mixer: agg.mixer,
                total_kg: agg.total_kg,
                dominant_stage: dominant_stage(&discharges),
                loads: load_sequence(agg, insumo_order),
                discharges,
            }
        })
        .collect();

    debug!(mixers = mixers.len(), "plan derived");
    MixerPlan { mixers }
}

/// Number of included rows per mixer, for summaries
pub fn pens_per_mixer(rows: &[RationRow]) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for entry in routed(rows) {
        *counts.entry(entry.mixer).or_insert(0) += 1;
    }
    counts
}
