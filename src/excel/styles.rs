//! Shared strings and number-format resolution
//!
//! Turns the stored value of a `<c>` element into either its native value
//! ([`RawValue`]) or the text a spreadsheet application would display.

use crate::error::{MixerError, MixerResult};
use crate::excel::xml;
use crate::types::RawValue;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use quick_xml::events::Event;
use std::collections::HashMap;

/// Built-in number format ids that render as dates or times
const BUILTIN_DATE_FORMATS: [u32; 12] = [14, 15, 16, 17, 18, 19, 20, 21, 22, 45, 46, 47];

/// Number formats of a workbook
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    /// Custom `numFmt` codes keyed by format id
    pub number_formats: HashMap<u32, String>,
    /// Effective format id of each `cellXfs` record, indexed by the cell's `s` attribute
    pub cell_formats: Vec<u32>,
}

impl StyleTable {
    /// Format id and code for a cell style index
    pub fn format_for(&self, style_index: Option<usize>) -> (u32, &str) {
        let format_id = style_index
            .and_then(|i| self.cell_formats.get(i).copied())
            .unwrap_or(0);
        (format_id, self.format_code(format_id))
    }

    /// Custom code for `format_id`, else the built-in percent codes, else ""
    pub fn format_code(&self, format_id: u32) -> &str {
        if let Some(code) = self.number_formats.get(&format_id) {
            return code;
        }
        match format_id {
            9 => "0%",
            10 => "0.00%",
            _ => "",
        }
    }
}

/// Read `xl/sharedStrings.xml` into a lookup table
///
/// Rich-text runs of one `<si>` are concatenated; phonetic runs are skipped.
pub fn resolve_shared_strings(xml_text: &str) -> MixerResult<Vec<String>> {
    let mut reader = xml::reader(xml_text);
    let mut buf = Vec::new();
    let mut strings = Vec::new();

    let mut in_si = false;
    let mut in_t = false;
    let mut phonetic_depth = 0usize;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => phonetic_depth += 1,
                b"t" if in_si && phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(ref e)) if in_t => {
                let text =
                    xml::text(e).map_err(|err| MixerError::xml("xl/sharedStrings.xml", err))?;
                current.push_str(&text);
            }
            Ok(Event::GeneralRef(ref e)) if in_t => {
                let text = xml::general_ref(e)
                    .map_err(|err| MixerError::xml("xl/sharedStrings.xml", err))?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MixerError::xml("xl/sharedStrings.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Read `xl/styles.xml`: custom number formats and `cellXfs` format ids
pub fn resolve_styles(xml_text: &str) -> MixerResult<StyleTable> {
    let mut reader = xml::reader(xml_text);
    let mut buf = Vec::new();
    let mut table = StyleTable::default();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = true,
                b"cellXfs" => in_cell_xfs = true,
                b"numFmt" if in_num_fmts => read_num_fmt(e, &mut table),
                b"xf" if in_cell_xfs => table.cell_formats.push(read_xf_format(e)),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"numFmt" if in_num_fmts => read_num_fmt(e, &mut table),
                b"xf" if in_cell_xfs => table.cell_formats.push(read_xf_format(e)),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MixerError::xml("xl/styles.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(table)
}

fn read_num_fmt(e: &quick_xml::events::BytesStart<'_>, table: &mut StyleTable) {
    let id = xml::attr(e, b"numFmtId").and_then(|s| s.parse::<u32>().ok());
    let code = xml::attr(e, b"formatCode");
    if let (Some(id), Some(code)) = (id, code) {
        table.number_formats.insert(id, code);
    }
}

fn read_xf_format(e: &quick_xml::events::BytesStart<'_>) -> u32 {
    xml::attr(e, b"numFmtId")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// True when a number format renders as a date or time
///
/// Built-in ids are checked first. Custom codes count as dates when they
/// contain a d/y/h/m/s/e pattern letter outside quoted literals, escapes and
/// bracketed colour or locale sections.
pub fn is_date_format(format_id: u32, custom_code: &str) -> bool {
    if BUILTIN_DATE_FORMATS.contains(&format_id) {
        return true;
    }

    let mut chars = custom_code.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let section: String = chars.by_ref().take_while(|c| *c != ']').collect();
                let elapsed = !section.is_empty()
                    && section
                        .chars()
                        .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'));
                if elapsed {
                    return true;
                }
            }
            c if matches!(c.to_ascii_lowercase(), 'd' | 'y' | 'h' | 'm' | 's' | 'e') => {
                return true;
            }
            _ => {}
        }
    }
    false
}

/// Convert an Excel serial day count (1900 system) to a date-time
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial.abs() > 3_000_000.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(chrono::Duration::try_milliseconds(millis)?)
}

fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Group thousands with commas and keep at most `max_fraction` decimals
pub fn format_grouped(n: f64, max_fraction: usize) -> String {
    let factor = 10f64.powi(max_fraction as i32);
    let rounded = (n * factor).round() / factor;
    let fixed = format!("{:.*}", max_fraction, rounded.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    if rounded < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn shared_lookup(raw: &str, shared: &[String]) -> String {
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(|i| shared.get(i))
        .cloned()
        .unwrap_or_default()
}

fn parse_stored_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Display text of a stored cell value
///
/// `raw` is the `<v>` content (or inline string text), `type_code` the `t`
/// attribute and `style_index` the `s` attribute.
pub fn render_cell_text(
    raw: Option<&str>,
    type_code: Option<&str>,
    style_index: Option<usize>,
    shared: &[String],
    styles: &StyleTable,
) -> String {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return String::new();
    };

    match type_code {
        Some("s") => shared_lookup(raw, shared),
        Some("b") => {
            if raw.trim() == "1" {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Some("str") | Some("inlineStr") | Some("e") => raw.to_string(),
        _ => {
            let Some(num) = parse_stored_number(raw) else {
                return raw.to_string();
            };
            let (format_id, code) = styles.format_for(style_index);
            if is_date_format(format_id, code) {
                if let Some(dt) = excel_serial_to_datetime(num) {
                    return format_datetime(dt);
                }
            }
            if code.contains('%') {
                return format!("{}%", format_grouped(num * 100.0, 2));
            }
            format_grouped(num, 3)
        }
    }
}

/// Native value of a stored cell
pub fn resolve_raw_value(raw: Option<&str>, type_code: Option<&str>, shared: &[String]) -> RawValue {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return RawValue::Empty;
    };

    match type_code {
        Some("s") => RawValue::Text(shared_lookup(raw, shared)),
        Some("b") => RawValue::Bool(raw.trim() == "1"),
        Some("str") | Some("inlineStr") | Some("e") => RawValue::Text(raw.to_string()),
        _ => match parse_stored_number(raw) {
            Some(n) => RawValue::Number(n),
            None => RawValue::Text(raw.to_string()),
        },
    }
}
