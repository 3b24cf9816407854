//! Worksheet cell reader
//!
//! Reads `xl/worksheets/sheetN.xml` into a sparse [`SheetGrid`] and replicates
//! the anchor value of every merged region into the empty cells it covers.

use crate::error::{MixerError, MixerResult};
use crate::excel::address::{parse_cell_address, parse_range_address};
use crate::excel::styles::{render_cell_text, resolve_raw_value, StyleTable};
use crate::excel::xml;
use crate::types::{Cell, CellCoord, SheetGrid, TableRange};
use quick_xml::events::{BytesStart, Event};
use tracing::trace;

/// Attributes of the `<c>` element currently being read
#[derive(Default)]
struct PendingCell {
    coord: Option<CellCoord>,
    type_code: Option<String>,
    style_index: Option<usize>,
    value: Option<String>,
}

/// Read a worksheet part; see [`read_sheet_part`]
pub fn read_sheet_cells(
    xml_text: &str,
    shared: &[String],
    styles: &StyleTable,
) -> MixerResult<SheetGrid> {
    read_sheet_part("worksheet", xml_text, shared, styles)
}

/// Read every cell of a worksheet, then propagate merged regions
///
/// `part` names the package entry in error messages.
pub fn read_sheet_part(
    part: &str,
    xml_text: &str,
    shared: &[String],
    styles: &StyleTable,
) -> MixerResult<SheetGrid> {
    let mut reader = xml::reader(xml_text);
    let mut buf = Vec::new();
    let mut grid = SheetGrid::new();
    let mut merges: Vec<TableRange> = Vec::new();

    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut pending: Option<PendingCell> = None;
    let mut in_v = false;
    let mut in_inline = false;
    let mut in_inline_t = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_index(e).unwrap_or(current_row);
                    next_col = 0;
                }
                b"c" => {
                    let cell = start_cell(e, current_row, next_col);
                    if let Some(coord) = cell.coord {
                        next_col = coord.col + 1;
                    }
                    pending = Some(cell);
                }
                b"v" if pending.is_some() => in_v = true,
                b"is" if pending.is_some() => in_inline = true,
                b"t" if in_inline => in_inline_t = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_index(e).map(|r| r + 1).unwrap_or(current_row + 1);
                    next_col = 0;
                }
                b"c" => {
                    let cell = start_cell(e, current_row, next_col);
                    if let Some(coord) = cell.coord {
                        next_col = coord.col + 1;
                    }
                }
                b"dimension" => {
                    grid.dimension = xml::attr(e, b"ref").and_then(|r| parse_range_address(&r));
                }
                b"mergeCell" => {
                    if let Some(range) = xml::attr(e, b"ref").and_then(|r| parse_range_address(&r)) {
                        merges.push(range);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_v || in_inline_t => {
                let text = xml::text(e).map_err(|err| MixerError::xml(part, err))?;
                append_value(&mut pending, &text);
            }
            Ok(Event::GeneralRef(ref e)) if in_v || in_inline_t => {
                let text = xml::general_ref(e).map_err(|err| MixerError::xml(part, err))?;
                append_value(&mut pending, &text);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_inline_t = false,
                b"is" => in_inline = false,
                b"row" => current_row += 1,
                b"c" => {
                    if let Some(cell) = pending.take() {
                        store_cell(&mut grid, cell, shared, styles);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MixerError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    for range in &merges {
        propagate_merge(&mut grid, range);
    }

    trace!(part, cells = grid.len(), merges = merges.len(), "sheet read");
    Ok(grid)
}

/// Zero-based row from a `<row r="N">` element
fn row_index(e: &BytesStart<'_>) -> Option<u32> {
    xml::attr(e, b"r")
        .and_then(|r| r.trim().parse::<u32>().ok())
        .and_then(|r| r.checked_sub(1))
}

fn start_cell(e: &BytesStart<'_>, current_row: u32, next_col: u32) -> PendingCell {
    let coord = match xml::attr(e, b"r") {
        Some(r) => parse_cell_address(&r),
        None => Some(CellCoord::new(current_row, next_col)),
    };
    PendingCell {
        coord,
        type_code: xml::attr(e, b"t"),
        style_index: xml::attr(e, b"s").and_then(|s| s.parse().ok()),
        value: None,
    }
}

fn append_value(pending: &mut Option<PendingCell>, text: &str) {
    if let Some(cell) = pending.as_mut() {
        cell.value.get_or_insert_with(String::new).push_str(text);
    }
}

fn store_cell(grid: &mut SheetGrid, cell: PendingCell, shared: &[String], styles: &StyleTable) {
    let Some(coord) = cell.coord else {
        return;
    };
    let raw_text = cell.value.as_deref();
    let type_code = cell.type_code.as_deref();
    let raw = resolve_raw_value(raw_text, type_code, shared);
    let text = render_cell_text(raw_text, type_code, cell.style_index, shared, styles);
    let parsed = Cell::new(raw, text);
    if parsed.is_empty() {
        return;
    }
    grid.insert(coord, parsed);
}

/// Copy a merged region's anchor value into its empty followers
///
/// Cells that already hold an authored value are left untouched.
pub fn propagate_merge(grid: &mut SheetGrid, range: &TableRange) {
    let Some(anchor) = grid.cells.get(&range.start).cloned() else {
        return;
    };
    if anchor.is_empty() {
        return;
    }
    for row in range.rows() {
        for col in range.cols() {
            let coord = CellCoord::new(row, col);
            if coord == range.start {
                continue;
            }
            let vacant = grid.cells.get(&coord).map_or(true, |c| c.is_empty());
            if vacant {
                grid.insert(coord, anchor.clone());
            }
        }
    }
}
