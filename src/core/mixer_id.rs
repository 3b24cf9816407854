//! Mixer identifier normalisation
//!
//! Spreadsheet authors write the mixer of a pen in many ways: `2`, `Mixer 2`,
//! `Carro Nº 3`, `#4`, `IV`, `dos`. Everything is reduced to a
//! [`MixerAssignment`]: a small positive integer or unassigned.
//!
//! Text goes through an ordered chain of pure matchers; the first one that
//! recognises the value decides.

use crate::types::{Cell, MixerAssignment, RawValue};
use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Largest identifier a mixer can carry; also bounds native numbers
pub const MAX_MIXER_ID: u32 = 99;

/// Value read from a MIXER-like cell
#[derive(Debug, Clone, PartialEq)]
pub enum MixerInput {
    Number(f64),
    Text(String),
}

impl MixerInput {
    /// Native value when the cell has one, else its display text
    pub fn from_cell(cell: &Cell) -> Self {
        match &cell.raw {
            RawValue::Number(n) => MixerInput::Number(*n),
            RawValue::Text(s) if !s.is_empty() => MixerInput::Text(s.clone()),
            _ => MixerInput::Text(cell.text.clone()),
        }
    }
}

impl From<&str> for MixerInput {
    fn from(s: &str) -> Self {
        MixerInput::Text(s.to_string())
    }
}

/// Normalise any mixer cell value
pub fn normalize_mixer(input: &MixerInput) -> MixerAssignment {
    match input {
        MixerInput::Number(n) => from_number(*n),
        MixerInput::Text(s) => normalize_text(s),
    }
}

/// String form of [`normalize_mixer`] for text input: `"2"` or `"Sin Mixer"`
pub fn normalize_mixer_str(value: &str) -> String {
    normalize_text(value).to_string()
}

fn from_number(n: f64) -> MixerAssignment {
    if !n.is_finite() {
        return MixerAssignment::Unassigned;
    }
    let rounded = n.round();
    if rounded < 1.0 || rounded > MAX_MIXER_ID as f64 {
        return MixerAssignment::Unassigned;
    }
    MixerAssignment::Assigned(rounded as u32)
}

type Matcher = fn(&str) -> Option<MixerAssignment>;

/// Matchers in priority order, applied to the folded text
const MATCHERS: [Matcher; 5] = [
    explicit_number,
    roman_numeral,
    spanish_word,
    sin_mixer_literal,
    isolated_digits,
];

fn normalize_text(value: &str) -> MixerAssignment {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '0') {
        return MixerAssignment::Unassigned;
    }

    let folded = fold(trimmed);
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(&folded))
        .unwrap_or(MixerAssignment::Unassigned)
}

/// NFKD, whitespace collapsed, lower-cased
fn fold(s: &str) -> String {
    let decomposed: String = s.nfkd().collect();
    decomposed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

fn from_digits(digits: &str) -> MixerAssignment {
    match digits.parse::<u32>() {
        Ok(n) if n > 0 => MixerAssignment::Assigned(n),
        _ => MixerAssignment::Unassigned,
    }
}

/// `2`, `2°`, `#2`, `no. 2`, `n°2`, `mixer-02`, bounded by punctuation
fn explicit_number(s: &str) -> Option<MixerAssignment> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = pattern(
        &RE,
        r"(?:^|[\s#:;,\-_/()])(?:no\.?|nº|n°|#)?\s*([0-9]{1,2})[º°]?(?:$|[\s;,\-_/()])",
    )?;
    let caps = re.captures(s)?;
    Some(from_digits(caps.get(1)?.as_str()))
}

/// `iv`, `mixer ii`, `carro x`; accepted when the value is in 1..=50
fn roman_numeral(s: &str) -> Option<MixerAssignment> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = pattern(
        &RE,
        r"(?:mix|mixer|carro|carrito)?\s*([ivx]{1,4})(?:$|[\s;,\-_/()])",
    )?;
    let numeral = re.captures(s)?.get(1)?.as_str();

    let mut value: i32 = 0;
    let mut prev = 0;
    for ch in numeral.chars().rev() {
        let cur = match ch {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            _ => 0,
        };
        if cur < prev {
            value -= cur;
        } else {
            value += cur;
        }
        prev = cur;
    }

    (1..=50)
        .contains(&value)
        .then(|| MixerAssignment::Assigned(value as u32))
}

/// `uno`..`diez`
fn spanish_word(s: &str) -> Option<MixerAssignment> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = pattern(
        &RE,
        r"\b(uno|dos|tres|cuatro|cinco|seis|siete|ocho|nueve|diez)\b",
    )?;
    let word = re.captures(s)?.get(1)?.as_str();
    let n = match word {
        "uno" => 1,
        "dos" => 2,
        "tres" => 3,
        "cuatro" => 4,
        "cinco" => 5,
        "seis" => 6,
        "siete" => 7,
        "ocho" => 8,
        "nueve" => 9,
        "diez" => 10,
        _ => return None,
    };
    Some(MixerAssignment::Assigned(n))
}

fn sin_mixer_literal(s: &str) -> Option<MixerAssignment> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = pattern(&RE, r"sin\s*mixer")?;
    re.is_match(s).then_some(MixerAssignment::Unassigned)
}

/// Last resort: any 1-2 digit run not touching other digits
fn isolated_digits(s: &str) -> Option<MixerAssignment> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = pattern(&RE, r"(?:^|[^0-9])([0-9]{1,2})(?:[^0-9]|$)")?;
    let caps = re.captures(s)?;
    Some(from_digits(caps.get(1)?.as_str()))
}
