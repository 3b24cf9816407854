//! Table locator
//!
//! Finds the Formula, Comida and discharge-order tables of a workbook.
//! Explicit Excel Table definitions are tried first across every sheet; only
//! targets still unresolved fall back to the sheet-name keyword and header
//! shape heuristic.

use crate::core::text::fold_accents;
use crate::error::{MixerError, MixerResult};
use crate::excel::address::parse_range_address;
use crate::excel::package::{parent_dir, resolve_target, PackageSource, SheetEntry, Workbook};
use crate::excel::xml;
use crate::types::{CellCoord, ExtractedTable, SheetGrid, TableRange, TableStrategy};
use quick_xml::events::Event;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Rows scanned for a header when no table definition exists
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 30;

/// A header row has at least this many non-empty cells...
const MIN_HEADER_CELLS: usize = 3;
/// ...of which at least this many contain a letter
const MIN_ALPHA_HEADER_CELLS: usize = 2;

//==============================================================================
// Targets
//==============================================================================

/// Logical table the planner needs from a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableTarget {
    Formula,
    Comida,
    DischargeOrder,
}

impl TableTarget {
    pub const ALL: [TableTarget; 3] = [
        TableTarget::Formula,
        TableTarget::Comida,
        TableTarget::DischargeOrder,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TableTarget::Formula => "Formula",
            TableTarget::Comida => "Comida",
            TableTarget::DischargeOrder => "Orden",
        }
    }

    /// Accepted Excel Table names, compared case-insensitively
    pub fn table_names(&self) -> &'static [&'static str] {
        match self {
            TableTarget::Formula => &["formula"],
            TableTarget::Comida => &["comida"],
            TableTarget::DischargeOrder => &["orden", "descarga", "recorrido"],
        }
    }

    /// Keywords looked up in accent-folded, lower-cased sheet names
    pub fn sheet_keywords(&self) -> &'static [&'static str] {
        match self {
            TableTarget::Formula => &["formula"],
            TableTarget::Comida => &["comida", "racion", "corrales"],
            TableTarget::DischargeOrder => &["orden", "descarga", "recorrido"],
        }
    }

    pub fn matches_table(&self, def: &TableDefinition) -> bool {
        [def.name.as_str(), def.display_name.as_str()]
            .iter()
            .map(|n| n.trim().to_lowercase())
            .any(|n| self.table_names().contains(&n.as_str()))
    }

    pub fn matches_sheet(&self, sheet_name: &str) -> bool {
        let folded = fold_accents(sheet_name);
        self.sheet_keywords().iter().any(|k| folded.contains(k))
    }

    pub fn not_found(&self) -> MixerError {
        MixerError::TableNotFound(self.label().to_string())
    }
}

impl fmt::Display for TableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//==============================================================================
// Table definitions
//==============================================================================

/// The `<table>` element of an `xl/tables/tableN.xml` part
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub display_name: String,
    pub range: Option<TableRange>,
}

/// Parse a table part; None when it has no `<table>` element
pub fn parse_table_definition(part: &str, xml_text: &str) -> MixerResult<Option<TableDefinition>> {
    let mut reader = xml::reader(xml_text);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"table" =>
            {
                return Ok(Some(TableDefinition {
                    name: xml::attr(e, b"name").unwrap_or_default(),
                    display_name: xml::attr(e, b"displayName").unwrap_or_default(),
                    range: xml::attr(e, b"ref").and_then(|r| parse_range_address(&r)),
                }));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(MixerError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }
}

//==============================================================================
// Header heuristic
//==============================================================================

/// First row among the leading `scan_rows` of `range` that looks like a header
pub fn find_header_row(grid: &SheetGrid, range: &TableRange, scan_rows: usize) -> Option<u32> {
    range
        .rows()
        .take(scan_rows)
        .find(|&row| looks_like_header(grid, range, row))
}

fn looks_like_header(grid: &SheetGrid, range: &TableRange, row: u32) -> bool {
    let mut filled = 0;
    let mut alphabetic = 0;
    for col in range.cols() {
        let Some(cell) = grid.get(row, col) else {
            continue;
        };
        let text = cell.display();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        filled += 1;
        if text.chars().any(char::is_alphabetic) {
            alphabetic += 1;
        }
    }
    filled >= MIN_HEADER_CELLS && alphabetic >= MIN_ALPHA_HEADER_CELLS
}

//==============================================================================
// Locator
//==============================================================================

/// Resolves [`TableTarget`]s against an opened workbook
#[derive(Debug, Clone)]
pub struct TableLocator {
    header_scan_rows: usize,
}

impl Default for TableLocator {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_SCAN_ROWS)
    }
}

impl TableLocator {
    pub fn new(header_scan_rows: usize) -> Self {
        Self {
            header_scan_rows: header_scan_rows.max(1),
        }
    }

    /// Locate every target; one result per target, in the order given
    ///
    /// The outer error is reserved for package-level failures (unreadable
    /// relationship parts). A missing or unreadable table only affects its
    /// own target.
    pub fn locate<S: PackageSource>(
        &self,
        workbook: &mut Workbook<S>,
        targets: &[TableTarget],
    ) -> MixerResult<Vec<(TableTarget, MixerResult<ExtractedTable>)>> {
        let sheets = workbook.sheets().to_vec();
        let mut grids: HashMap<String, SheetGrid> = HashMap::new();
        let mut found: HashMap<TableTarget, MixerResult<ExtractedTable>> = HashMap::new();

        for sheet in &sheets {
            if targets.iter().all(|t| found.contains_key(t)) {
                break;
            }
            self.scan_table_definitions(workbook, &mut grids, sheet, targets, &mut found)?;
        }

        for &target in targets {
            if found.contains_key(&target) {
                continue;
            }
            let result = self.scan_sheets(workbook, &mut grids, &sheets, target);
            found.insert(target, result);
        }

        Ok(targets
            .iter()
            .map(|&t| {
                let result = found.remove(&t).unwrap_or_else(|| Err(t.not_found()));
                (t, result)
            })
            .collect())
    }

    /// Strategy A: follow the sheet's table relationships
    fn scan_table_definitions<S: PackageSource>(
        &self,
        workbook: &mut Workbook<S>,
        grids: &mut HashMap<String, SheetGrid>,
        sheet: &SheetEntry,
        targets: &[TableTarget],
        found: &mut HashMap<TableTarget, MixerResult<ExtractedTable>>,
    ) -> MixerResult<()> {
        let rels = workbook.sheet_relationships(sheet)?;
        for rel in rels.iter().filter(|r| r.is_kind("table")) {
            let path = resolve_target(parent_dir(&sheet.path), &rel.target);
            let Some(text) = workbook.read_part(&path)? else {
                debug!(sheet = %sheet.name, part = %path, "table part missing");
                continue;
            };
            let def = match parse_table_definition(&path, &text) {
                Ok(Some(def)) => def,
                Ok(None) => continue,
                Err(e) => {
                    warn!(part = %path, error = %e, "skipping unreadable table definition");
                    continue;
                }
            };
            let Some(target) = targets
                .iter()
                .copied()
                .find(|t| !found.contains_key(t) && t.matches_table(&def))
            else {
                continue;
            };
            let Some(range) = def.range else {
                warn!(table = %def.name, "table definition has no usable ref");
                continue;
            };

            debug!(
                target = %target,
                sheet = %sheet.name,
                table = %def.name,
                rows = range.height(),
                cols = range.width(),
                "located table definition"
            );
            let result = load_grid(workbook, grids, sheet).map(|grid| {
                ExtractedTable::from_matrix(
                    &sheet.name,
                    &def.name,
                    TableStrategy::TableDefinition,
                    range,
                    grid.extract(&range),
                )
            });
            found.insert(target, result);
        }
        Ok(())
    }

    /// Strategy B: keyword-named sheets plus header-shape scan
    fn scan_sheets<S: PackageSource>(
        &self,
        workbook: &mut Workbook<S>,
        grids: &mut HashMap<String, SheetGrid>,
        sheets: &[SheetEntry],
        target: TableTarget,
    ) -> MixerResult<ExtractedTable> {
        let mut last_error = None;

        for sheet in sheets.iter().filter(|s| target.matches_sheet(&s.name)) {
            let grid = match load_grid(workbook, grids, sheet) {
                Ok(grid) => grid,
                Err(e) => {
                    warn!(sheet = %sheet.name, error = %e, "cannot read candidate sheet");
                    last_error = Some(e);
                    continue;
                }
            };
            let Some(used) = grid.used_range() else {
                debug!(sheet = %sheet.name, "candidate sheet is empty");
                continue;
            };

            let header_row = match find_header_row(grid, &used, self.header_scan_rows) {
                Some(row) => row,
                None => {
                    warn!(
                        target = %target,
                        sheet = %sheet.name,
                        scanned = self.header_scan_rows,
                        "no header-like row found, using the first row"
                    );
                    used.start.row
                }
            };
            let range = TableRange::new(CellCoord::new(header_row, used.start.col), used.end);

            debug!(
                target = %target,
                sheet = %sheet.name,
                header_row = header_row + 1,
                "located table by sheet heuristic"
            );
            return Ok(ExtractedTable::from_matrix(
                &sheet.name,
                &sheet.name,
                TableStrategy::SheetHeuristic,
                range,
                grid.extract(&range),
            ));
        }

        Err(last_error.unwrap_or_else(|| target.not_found()))
    }
}

fn load_grid<'g, S: PackageSource>(
    workbook: &mut Workbook<S>,
    grids: &'g mut HashMap<String, SheetGrid>,
    sheet: &SheetEntry,
) -> MixerResult<&'g SheetGrid> {
    match grids.entry(sheet.path.clone()) {
        Entry::Occupied(e) => Ok(e.into_mut()),
        Entry::Vacant(e) => {
            let grid = workbook.sheet_grid(sheet)?;
            Ok(e.insert(grid))
        }
    }
}
