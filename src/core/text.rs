//! Text folding helpers shared by header, stage and sheet-name matching

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collapse whitespace runs to single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case, compatibility-decompose and drop combining marks
///
/// `"Ración"` becomes `"racion"`, `"Nº"` becomes `"no"`.
pub fn fold_accents(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Key used to compare header labels: trimmed, collapsed, lower-cased
pub fn header_key(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}
