//! A1-style address helpers
//!
//! Converts between spreadsheet notation (`B7`, `A1:H20`) and zero-based
//! integer coordinates.

use crate::types::{CellCoord, TableRange};

/// Convert a column label to a zero-based index (A→0, Z→25, AA→26)
///
/// Returns None for empty input or any non-letter character.
pub fn column_label_to_index(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Convert a zero-based column index to its label (0→A, 25→Z, 26→AA)
pub fn index_to_column_label(index: u32) -> String {
    let mut result = String::new();
    let mut num = index;

    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}

/// Parse the first `[A-Z]+[0-9]+` reference in `reference`
///
/// `$` markers are skipped, so `$B$7` parses like `B7`. Row numbers are
/// one-based in the sheet and zero-based in the result.
pub fn parse_cell_address(reference: &str) -> Option<CellCoord> {
    let bytes = reference.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_uppercase() {
            i += 1;
            continue;
        }
        let letters_start = i;
        while i < bytes.len() && bytes[i].is_ascii_uppercase() {
            i += 1;
        }
        let letters_end = i;
        if i < bytes.len() && bytes[i] == b'$' {
            i += 1;
        }
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            continue;
        }
        let col = column_label_to_index(&reference[letters_start..letters_end])?;
        let row: u32 = reference[digits_start..i].parse().ok()?;
        if row == 0 {
            return None;
        }
        return Some(CellCoord::new(row - 1, col));
    }
    None
}

/// Parse `A1:H20` into a range
///
/// A reference without `:` is not a range and yields None.
pub fn parse_range_address(reference: &str) -> Option<TableRange> {
    let (start, end) = reference.split_once(':')?;
    let start = parse_cell_address(start)?;
    let end = parse_cell_address(end)?;
    Some(TableRange::new(start, end))
}

/// Render a coordinate back to A1 notation
pub fn format_cell_address(coord: CellCoord) -> String {
    format!("{}{}", index_to_column_label(coord.col), coord.row + 1)
}
