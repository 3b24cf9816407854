use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

//==============================================================================
// Cell Model
//==============================================================================

/// Zero-based (row, col) coordinate inside a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Rectangular, inclusive range of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl TableRange {
    /// Build a range from two corners in any order
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        Self {
            start: CellCoord::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellCoord::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.start.row..=self.end.row).contains(&coord.row)
            && (self.start.col..=self.end.col).contains(&coord.col)
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.start.row..=self.end.row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<u32> {
        self.start.col..=self.end.col
    }
}

/// Typed value of a cell as stored in the sheet
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Plain string rendering (no number formatting applied)
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Empty => String::new(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
            RawValue::Bool(b) => b.to_string(),
        }
    }
}

/// A parsed cell: native value plus its display-formatted text
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Cell {
    pub raw: RawValue,
    pub text: String,
}

impl Cell {
    pub fn new(raw: RawValue, text: impl Into<String>) -> Self {
        Self {
            raw,
            text: text.into(),
        }
    }

    pub fn text(value: &str) -> Self {
        Self::new(RawValue::Text(value.to_string()), value)
    }

    pub fn number(value: f64) -> Self {
        Self::new(RawValue::Number(value), value.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.text.is_empty()
    }

    /// Display text, falling back to the raw value
    pub fn display(&self) -> String {
        if self.text.is_empty() {
            self.raw.to_text()
        } else {
            self.text.clone()
        }
    }
}

/// Sparse cell map of one worksheet
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    pub cells: HashMap<CellCoord, Cell>,
    /// Declared `<dimension>` extent, when it parsed as a two-corner range
    pub dimension: Option<TableRange>,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&CellCoord::new(row, col))
    }

    pub fn insert(&mut self, coord: CellCoord, cell: Cell) {
        self.cells.insert(coord, cell);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Declared dimension, else (0,0) up to the furthest observed cell
    pub fn used_range(&self) -> Option<TableRange> {
        if let Some(dim) = self.dimension {
            return Some(dim);
        }
        if self.cells.is_empty() {
            return None;
        }
        let max_row = self.cells.keys().map(|c| c.row).max().unwrap_or(0);
        let max_col = self.cells.keys().map(|c| c.col).max().unwrap_or(0);
        Some(TableRange::new(
            CellCoord::new(0, 0),
            CellCoord::new(max_row, max_col),
        ))
    }

    /// Dense copy of a rectangle; missing cells come back empty
    pub fn extract(&self, range: &TableRange) -> Vec<Vec<Cell>> {
        range
            .rows()
            .map(|row| {
                range
                    .cols()
                    .map(|col| self.get(row, col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

//==============================================================================
// Extracted Tables
//==============================================================================

/// How a table was located inside the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStrategy {
    /// Explicit Excel Table definition (`xl/tables/tableN.xml`)
    TableDefinition,
    /// Sheet-name keyword plus header-shape heuristic
    SheetHeuristic,
}

/// One data row of an extracted table, one cell per header column
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }
}

/// A table recovered from a sheet: header labels plus data rows
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTable {
    pub sheet_name: String,
    pub table_name: String,
    pub strategy: TableStrategy,
    pub range: TableRange,
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ExtractedTable {
    /// Build from a dense matrix whose first row holds the headers
    pub fn from_matrix(
        sheet_name: &str,
        table_name: &str,
        strategy: TableStrategy,
        range: TableRange,
        matrix: Vec<Vec<Cell>>,
    ) -> Self {
        let mut iter = matrix.into_iter();
        let headers: Vec<String> = iter
            .next()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let label = cell.display();
                if label.trim().is_empty() {
                    format!("Col {}", i + 1)
                } else {
                    label
                }
            })
            .collect();
        let rows = iter.map(|cells| TableRow { cells }).collect();

        Self {
            sheet_name: sheet_name.to_string(),
            table_name: table_name.to_string(),
            strategy,
            range,
            headers,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

//==============================================================================
// Ration Domain
//==============================================================================

/// Literal used for rows without a mixer
pub const SIN_MIXER: &str = "Sin Mixer";

/// Canonical mixer key: a small positive integer, or unassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum MixerAssignment {
    Assigned(u32),
    #[default]
    Unassigned,
}

impl MixerAssignment {
    pub fn id(&self) -> Option<u32> {
        match self {
            MixerAssignment::Assigned(n) => Some(*n),
            MixerAssignment::Unassigned => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, MixerAssignment::Assigned(_))
    }
}

impl fmt::Display for MixerAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerAssignment::Assigned(n) => write!(f, "{}", n),
            MixerAssignment::Unassigned => f.write_str(SIN_MIXER),
        }
    }
}

impl Serialize for MixerAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MixerAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        let input = match Repr::deserialize(deserializer)? {
            Repr::Number(n) => crate::core::mixer_id::MixerInput::Number(n),
            Repr::Text(s) => crate::core::mixer_id::MixerInput::Text(s),
        };
        Ok(crate::core::mixer_id::normalize_mixer(&input))
    }
}

/// Feeding phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Inicio,
    Recria,
    Terminacion,
    Default,
}

impl Stage {
    pub const FEEDING: [Stage; 3] = [Stage::Inicio, Stage::Recria, Stage::Terminacion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Inicio => "Inicio",
            Stage::Recria => "Recria",
            Stage::Terminacion => "Terminacion",
            Stage::Default => "Default",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled ration row of the "Comida" table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RationRow {
    /// Index of the data row inside the extracted table
    #[serde(skip)]
    pub source_row: usize,
    #[serde(rename = "Corral")]
    pub corral: String,
    #[serde(rename = "Cab")]
    pub cab: u32,
    #[serde(rename = "Etapa")]
    pub etapa: String,
    #[serde(rename = "MIXER")]
    pub mixer: MixerAssignment,
    /// Percentage points, 100 = no adjustment
    #[serde(rename = "Ajuste")]
    pub ajuste: f64,
    /// Kilograms per head per day
    #[serde(rename = "KgTC/Dia")]
    pub kg_tc_dia: f64,
    /// Kilograms per day for the whole pen
    #[serde(rename = "Kg")]
    pub kg: f64,
}

//==============================================================================
// Mixer Plan
//==============================================================================

/// Per-mixer totals, rebuilt from scratch on every input change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixerAggregate {
    pub mixer: u32,
    pub total_kg: f64,
    pub insumos_kg: BTreeMap<String, f64>,
}

impl MixerAggregate {
    pub fn new(mixer: u32) -> Self {
        Self {
            mixer,
            total_kg: 0.0,
            insumos_kg: BTreeMap::new(),
        }
    }
}

/// One ingredient load with the cumulative mass in the mixer afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStep {
    pub insumo: String,
    pub kg: f64,
    pub cumulative_kg: f64,
}

/// One pen discharge with the mass left in the mixer afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DischargeStop {
    pub corral: String,
    pub stage: Stage,
    pub kg: f64,
    pub remaining_kg: f64,
}

/// Loading and discharge plan of a single mixer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixerRoute {
    pub mixer: u32,
    pub total_kg: f64,
    pub dominant_stage: Stage,
    pub loads: Vec<LoadStep>,
    pub discharges: Vec<DischargeStop>,
}

/// Full plan, mixers in ascending order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixerPlan {
    pub mixers: Vec<MixerRoute>,
}

impl MixerPlan {
    pub fn mixer(&self, id: u32) -> Option<&MixerRoute> {
        self.mixers.iter().find(|m| m.mixer == id)
    }
}

/// Ordering hints for pen discharges, keyed by mixer
///
/// Only an ordering preference: pens missing from a hint are appended in the
/// order they were first seen, and stale names are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DischargeOrder {
    pub mixers: BTreeMap<u32, Vec<String>>,
}

impl DischargeOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mixer: u32) -> Option<&[String]> {
        self.mixers.get(&mixer).map(|v| v.as_slice())
    }

    pub fn set(&mut self, mixer: u32, pens: Vec<String>) {
        self.mixers.insert(mixer, pens);
    }

    pub fn is_empty(&self) -> bool {
        self.mixers.is_empty()
    }

    /// Overlay `other` on top of self, mixer by mixer
    pub fn merge(&mut self, other: &DischargeOrder) {
        for (mixer, pens) in &other.mixers {
            self.mixers.insert(*mixer, pens.clone());
        }
    }

    /// Record the current route of every mixer that has no hint yet
    pub fn seed_defaults(&mut self, plan: &MixerPlan) {
        for route in &plan.mixers {
            if self.mixers.contains_key(&route.mixer) || route.discharges.is_empty() {
                continue;
            }
            let pens = route.discharges.iter().map(|d| d.corral.clone()).collect();
            self.mixers.insert(route.mixer, pens);
        }
    }

    /// Move one pen inside a mixer's hint; returns false when an index is out of range
    pub fn move_pen(&mut self, mixer: u32, from: usize, to: usize) -> bool {
        let Some(pens) = self.mixers.get_mut(&mixer) else {
            return false;
        };
        if from >= pens.len() || to >= pens.len() {
            return false;
        }
        let pen = pens.remove(from);
        pens.insert(to, pen);
        true
    }
}
