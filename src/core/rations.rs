//! Ration row builder and mixer gap filling
//!
//! Turns the located Comida table into canonical [`RationRow`]s. Missing
//! masses are derived from each other, and rows without a recognisable mixer
//! go through a cascade of passes, each one touching only rows that are still
//! unassigned:
//!
//! 1. re-read a column literally headed `MIXER`
//! 2. scan the row for mixer-looking keys or values
//! 3. scan the row outside numeric columns, accepting 1..=20
//! 4. inherit the last mixer seen above (global)
//! 5. inherit the last mixer seen for the same pen

use crate::core::mixer_id::{normalize_mixer, MixerInput};
use crate::core::numeric::{cell_number, parse_number};
use crate::core::stage::canonical_etapa;
use crate::core::synonyms::{HeaderMap, RationField};
use crate::core::text::header_key;
use crate::types::{Cell, ExtractedTable, MixerAssignment, RationRow, RawValue, TableRow};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Highest mixer number accepted by the unrestricted row scan
const MAX_SCANNED_MIXER: u32 = 20;

/// Canonical rows of a Comida table plus the header mapping used to read them
#[derive(Debug, Clone, Default, Serialize)]
pub struct RationTable {
    pub rows: Vec<RationRow>,
    pub header_map: HeaderMap,
    /// Data rows dropped for having no Corral
    pub discarded: usize,
}

impl RationTable {
    /// Build canonical rows and run the gap-filling cascade
    pub fn from_table(
        table: &ExtractedTable,
        extra_synonyms: &HashMap<RationField, Vec<String>>,
    ) -> Self {
        let header_map = HeaderMap::resolve(&table.headers, extra_synonyms);
        debug!(
            table = %table.table_name,
            resolved = header_map.len(),
            missing = ?header_map.missing(),
            "ration headers resolved"
        );

        let built: Vec<RationRow> = table
            .rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| build_row(idx, row, &header_map))
            .collect();
        let discarded = table.rows.len() - built.len();

        let rows = fill_mixer_gaps(built, table);
        let unassigned = rows.iter().filter(|r| !r.mixer.is_assigned()).count();
        debug!(rows = rows.len(), discarded, unassigned, "ration rows built");

        Self {
            rows,
            header_map,
            discarded,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

//==============================================================================
// Row builder
//==============================================================================

fn field_cell<'a>(row: &'a TableRow, map: &HeaderMap, field: RationField) -> Option<&'a Cell> {
    map.column(field).and_then(|col| row.cell(col))
}

fn field_number(row: &TableRow, map: &HeaderMap, field: RationField) -> Option<f64> {
    field_cell(row, map, field).and_then(cell_number)
}

fn field_text(row: &TableRow, map: &HeaderMap, field: RationField) -> String {
    field_cell(row, map, field)
        .map(|c| c.display().trim().to_string())
        .unwrap_or_default()
}

/// Percentage points from a cell: `%` stripped, fractions scaled, default 100
pub fn parse_ajuste(cell: Option<&Cell>) -> f64 {
    let value = cell.and_then(|c| match &c.raw {
        RawValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        _ => parse_number(&c.display().replace('%', "")),
    });
    match value {
        Some(v) if v <= 1.0 => v * 100.0,
        Some(v) => v,
        None => 100.0,
    }
}

/// Build one canonical row; None when the row has no Corral
pub fn build_row(source_row: usize, row: &TableRow, map: &HeaderMap) -> Option<RationRow> {
    let corral = field_text(row, map, RationField::Corral);
    if corral.is_empty() {
        return None;
    }

    let cab = field_number(row, map, RationField::Cab).map_or(0, |c| c.round().max(0.0) as u32);
    // derivations only trust a positive head count
    let heads = Some(f64::from(cab)).filter(|h| *h > 0.0);

    let mixer = field_cell(row, map, RationField::Mixer)
        .map(|cell| normalize_mixer(&MixerInput::from_cell(cell)))
        .unwrap_or(MixerAssignment::Unassigned);

    let ajuste = parse_ajuste(field_cell(row, map, RationField::Ajuste));

    let mut kg = field_number(row, map, RationField::Kg);
    if kg.is_none() {
        let am = field_number(row, map, RationField::KgManiana);
        let pm = field_number(row, map, RationField::KgTarde);
        if am.is_some() || pm.is_some() {
            kg = Some(am.unwrap_or(0.0) + pm.unwrap_or(0.0));
        }
    }

    let mut kg_tc_dia = field_number(row, map, RationField::KgTcDia);
    if kg_tc_dia.is_none() {
        if let (Some(total), Some(heads)) = (kg, heads) {
            kg_tc_dia = Some(total / heads);
        }
    }
    if kg.is_none() {
        if let (Some(per_head), Some(heads)) = (kg_tc_dia, heads) {
            kg = Some(per_head * heads);
        }
    }

    Some(RationRow {
        source_row,
        corral,
        cab,
        etapa: canonical_etapa(&field_text(row, map, RationField::Etapa)),
        mixer,
        ajuste,
        kg_tc_dia: kg_tc_dia.unwrap_or(0.0),
        kg: kg.unwrap_or(0.0),
    })
}

//==============================================================================
// Gap filling
//==============================================================================

/// Run all five passes in order
pub fn fill_mixer_gaps(rows: Vec<RationRow>, table: &ExtractedTable) -> Vec<RationRow> {
    let rows = fill_from_mixer_column(rows, table);
    let rows = fill_from_keyword_scan(rows, table);
    let rows = fill_from_unrestricted_scan(rows, table);
    let rows = inherit_global(rows);
    inherit_per_pen(rows)
}

/// Apply `resolve` to every still-unassigned row
fn resolve_unassigned<F>(rows: Vec<RationRow>, mut resolve: F) -> Vec<RationRow>
where
    F: FnMut(&RationRow) -> Option<MixerAssignment>,
{
    rows.into_iter()
        .map(|mut row| {
            if !row.mixer.is_assigned() {
                if let Some(found) = resolve(&row).filter(|m| m.is_assigned()) {
                    row.mixer = found;
                }
            }
            row
        })
        .collect()
}

/// Column headed exactly `MIXER`, else the first header with the word `mixer`
fn literal_mixer_column(headers: &[String]) -> Option<usize> {
    let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
    keys.iter()
        .position(|k| k == "mixer")
        .or_else(|| keys.iter().position(|k| k.split(' ').any(|w| w == "mixer")))
}

/// Pass 1
pub fn fill_from_mixer_column(rows: Vec<RationRow>, table: &ExtractedTable) -> Vec<RationRow> {
    let Some(col) = literal_mixer_column(&table.headers) else {
        return rows;
    };
    resolve_unassigned(rows, |row| {
        let cell = table.rows.get(row.source_row)?.cell(col)?;
        Some(normalize_mixer(&MixerInput::from_cell(cell)))
    })
}

/// `(header, value)` pairs of a row: display entries first, then raw entries
fn row_entries<'a>(table: &'a ExtractedTable, row: &RationRow) -> Vec<(&'a str, MixerInput)> {
    let Some(source) = table.rows.get(row.source_row) else {
        return Vec::new();
    };
    let pairs = || table.headers.iter().map(String::as_str).zip(source.cells.iter());

    let display = pairs()
        .filter(|(_, cell)| !cell.text.trim().is_empty())
        .map(|(key, cell)| (key, MixerInput::Text(cell.text.clone())));
    let raw = pairs().filter_map(|(key, cell)| match &cell.raw {
        RawValue::Number(n) => Some((key, MixerInput::Number(*n))),
        RawValue::Text(s) if !s.trim().is_empty() => Some((key, MixerInput::Text(s.clone()))),
        _ => None,
    });
    display.chain(raw).collect()
}

fn input_text(input: &MixerInput) -> String {
    match input {
        MixerInput::Number(n) => n.to_string(),
        MixerInput::Text(s) => s.to_lowercase(),
    }
}

fn regex_cell(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

/// Pass 2
pub fn fill_from_keyword_scan(rows: Vec<RationRow>, table: &ExtractedTable) -> Vec<RationRow> {
    static KEY: OnceLock<Option<Regex>> = OnceLock::new();
    static VALUE: OnceLock<Option<Regex>> = OnceLock::new();
    let (Some(key_re), Some(value_re)) = (
        regex_cell(&KEY, r"mix|mixer|carro|nro|n°|nº|#"),
        regex_cell(&VALUE, r"mix|mixer|carro"),
    ) else {
        return rows;
    };

    resolve_unassigned(rows, |row| {
        row_entries(table, row)
            .into_iter()
            .filter(|(key, value)| {
                key_re.is_match(&key.to_lowercase()) || value_re.is_match(&input_text(value))
            })
            .map(|(_, value)| normalize_mixer(&value))
            .find(MixerAssignment::is_assigned)
    })
}

/// Pass 3
pub fn fill_from_unrestricted_scan(rows: Vec<RationRow>, table: &ExtractedTable) -> Vec<RationRow> {
    static BLOCKED: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(blocked) = regex_cell(
        &BLOCKED,
        r"cab|cabeza|kg|kgtc|total|ajuste|ms|mv|%|dia|día|am|pm",
    ) else {
        return rows;
    };

    resolve_unassigned(rows, |row| {
        row_entries(table, row)
            .into_iter()
            .filter(|(key, _)| !blocked.is_match(&key.to_lowercase()))
            .map(|(_, value)| normalize_mixer(&value))
            .find(|m| m.id().is_some_and(|id| (1..=MAX_SCANNED_MIXER).contains(&id)))
    })
}

/// Pass 4: fold carrying the last assigned mixer
pub fn inherit_global(rows: Vec<RationRow>) -> Vec<RationRow> {
    rows.into_iter()
        .scan(None, |last: &mut Option<MixerAssignment>, mut row| {
            if row.mixer.is_assigned() {
                *last = Some(row.mixer);
            } else if let Some(mixer) = *last {
                row.mixer = mixer;
            }
            Some(row)
        })
        .collect()
}

/// Pen key: trimmed, whitespace collapsed, lower-cased
pub fn pen_key(corral: &str) -> String {
    header_key(corral)
}

/// Pass 5: fold carrying the last assigned mixer of each pen
pub fn inherit_per_pen(rows: Vec<RationRow>) -> Vec<RationRow> {
    rows.into_iter()
        .scan(
            HashMap::<String, MixerAssignment>::new(),
            |seen, mut row| {
                let key = pen_key(&row.corral);
                if row.mixer.is_assigned() {
                    seen.insert(key, row.mixer);
                } else if let Some(mixer) = seen.get(&key) {
                    row.mixer = *mixer;
                }
                Some(row)
            },
        )
        .collect()
}
