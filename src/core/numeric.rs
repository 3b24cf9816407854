//! Number parsing for cell values

use crate::types::{Cell, RawValue};

/// Parse a whole trimmed string as a finite number; empty text is not a number
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Tolerant parse: keeps digits, sign and separators, accepts a comma decimal
///
/// `"50 %"` → 50, `"12,5"` → 12.5, `"abc"` → None.
pub fn parse_lenient(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    parse_number(&kept.replacen(',', ".", 1))
}

/// Numeric value of a cell: the native number, else its text parsed strictly
pub fn cell_number(cell: &Cell) -> Option<f64> {
    match &cell.raw {
        RawValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        RawValue::Text(s) if !s.trim().is_empty() => parse_number(s),
        RawValue::Bool(_) => None,
        _ => parse_number(&cell.text),
    }
}
