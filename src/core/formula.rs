//! Ingredient inclusion map from the Formula table
//!
//! The Formula table lists one ingredient (Insumo) per row and one column per
//! diet stage holding that ingredient's share of the ration, either as a
//! fraction (`0.5`) or in percent (`50`).

use crate::core::numeric::parse_lenient;
use crate::core::stage::stage_of;
use crate::core::text::{fold_accents, header_key};
use crate::types::{Cell, ExtractedTable, RawValue, Stage};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Share of one ingredient in a stage's ration, in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inclusion {
    pub insumo: String,
    pub fraction: f64,
}

/// Per-stage inclusion fractions plus the ingredient order of the sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InclusionTable {
    pub stages: BTreeMap<Stage, Vec<Inclusion>>,
    /// Ingredients in the order they first appear
    pub insumo_order: Vec<String>,
    /// Header of the ingredient column, when one was found
    pub insumo_column: Option<String>,
    /// Stage-like values of a Dieta/Etapa style column, first occurrence order
    pub diet_labels: Vec<String>,
}

/// Headers whose values name the diets a formula covers
const DIET_COLUMNS: [&str; 5] = ["dieta", "etapa", "formula", "nombre", "tipo"];

impl InclusionTable {
    pub fn from_table(table: &ExtractedTable) -> Self {
        let stage_columns: Vec<(usize, Stage)> = table
            .headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| match stage_of(h) {
                Stage::Default => None,
                stage => Some((i, stage)),
            })
            .collect();

        let Some(insumo_col) = insumo_column(table, &stage_columns) else {
            warn!(table = %table.table_name, "formula table has no ingredient column");
            return Self::default();
        };

        let mut inclusion = Self {
            insumo_column: table.headers.get(insumo_col).cloned(),
            diet_labels: diet_labels(table),
            ..Self::default()
        };
        for &(_, stage) in &stage_columns {
            inclusion.stages.entry(stage).or_default();
        }

        for row in &table.rows {
            let Some(insumo) = row
                .cell(insumo_col)
                .map(|c| c.display().trim().to_string())
                .filter(|s| !s.is_empty())
            else {
                continue;
            };
            if !inclusion.insumo_order.contains(&insumo) {
                inclusion.insumo_order.push(insumo.clone());
            }
            for &(col, stage) in &stage_columns {
                let Some(mut fraction) = row.cell(col).and_then(inclusion_value) else {
                    continue;
                };
                if fraction > 1.0 {
                    fraction /= 100.0;
                }
                inclusion.set(stage, &insumo, fraction);
            }
        }

        debug!(
            insumos = inclusion.insumo_order.len(),
            stages = stage_columns.len(),
            "inclusion map built"
        );
        inclusion
    }

    /// Insert or overwrite an ingredient's fraction, keeping its first position
    pub fn set(&mut self, stage: Stage, insumo: &str, fraction: f64) {
        let list = self.stages.entry(stage).or_default();
        match list.iter_mut().find(|i| i.insumo == insumo) {
            Some(existing) => existing.fraction = fraction,
            None => list.push(Inclusion {
                insumo: insumo.to_string(),
                fraction,
            }),
        }
    }

    pub fn inclusions(&self, stage: Stage) -> &[Inclusion] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fraction(&self, stage: Stage, insumo: &str) -> Option<f64> {
        self.inclusions(stage)
            .iter()
            .find(|i| i.insumo == insumo)
            .map(|i| i.fraction)
    }

    /// Diets offered by the formula
    ///
    /// Labels from a Dieta/Etapa column win; otherwise the stages that have
    /// an inclusion column; otherwise all three feeding stages.
    pub fn diets(&self) -> Vec<String> {
        if !self.diet_labels.is_empty() {
            return self.diet_labels.clone();
        }
        let present: Vec<Stage> = Stage::FEEDING
            .into_iter()
            .filter(|s| self.stages.contains_key(s))
            .collect();
        let stages = if present.is_empty() {
            Stage::FEEDING.to_vec()
        } else {
            present
        };
        stages.iter().map(|s| s.as_str().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.values().all(|v| v.is_empty())
    }
}

fn diet_labels(table: &ExtractedTable) -> Vec<String> {
    let Some(col) = table
        .headers
        .iter()
        .position(|h| DIET_COLUMNS.contains(&fold_accents(h).trim()))
    else {
        return Vec::new();
    };
    let mut labels: Vec<String> = Vec::new();
    for row in &table.rows {
        let Some(value) = row.cell(col).map(|c| c.display().trim().to_string()) else {
            continue;
        };
        if stage_of(&value) != Stage::Default && !labels.contains(&value) {
            labels.push(value);
        }
    }
    labels
}

fn inclusion_value(cell: &Cell) -> Option<f64> {
    match cell.raw {
        RawValue::Number(n) if n.is_finite() => Some(n),
        _ => parse_lenient(&cell.display()),
    }
}

/// Header mentioning insumo/ingrediente, else the most textual non-stage column
fn insumo_column(table: &ExtractedTable, stage_columns: &[(usize, Stage)]) -> Option<usize> {
    if let Some(col) = table.headers.iter().position(|h| {
        let key = header_key(h);
        key.contains("insumo") || key.contains("ingred")
    }) {
        return Some(col);
    }

    let mut best: Option<(usize, f64)> = None;
    for col in 0..table.headers.len() {
        if stage_columns.iter().any(|(c, _)| *c == col) {
            continue;
        }
        let ratio = non_numeric_ratio(table, col);
        if best.map_or(true, |(_, r)| ratio > r) {
            best = Some((col, ratio));
        }
    }
    best.map(|(col, _)| col)
}

/// Share of non-empty values in a column that are not plain numbers
fn non_numeric_ratio(table: &ExtractedTable, col: usize) -> f64 {
    let mut total = 0usize;
    let mut textual = 0usize;
    for cell in table.rows.iter().filter_map(|r| r.cell(col)) {
        let text = cell.display();
        if text.trim().is_empty() {
            continue;
        }
        total += 1;
        if parse_lenient(&text).is_none() || text.chars().any(|c| c.is_ascii_alphabetic()) {
            textual += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        textual as f64 / total as f64
    }
}
