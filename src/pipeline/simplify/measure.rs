//! Measurement and number normalization.
//!
//! One scan covers dimension blocks with a unit, unit-less dimension blocks,
//! and lone decimals, so converted measurements are never rounded a second time.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static NUMBER_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)((?:[ \t]*[x×][ \t]*\d+(?:\.\d+)?){0,3})(?:[ \t]*(mm|cm)\b)?")
        .expect("valid regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// Convert mm/cm dimension blocks, round decimals, and space out `x` separators.
pub fn normalize_numbers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in NUMBER_BLOCK_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        if is_part_of_date(text, whole.start(), whole.end()) {
            out.push_str(whole.as_str());
        } else {
            out.push_str(&rewrite_block(&caps));
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

fn rewrite_block(caps: &Captures) -> String {
    let whole = &caps[0];
    let values: Vec<f64> = NUMBER_RE
        .find_iter(whole.trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace()))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if values.is_empty() {
        return whole.to_string();
    }

    match caps.get(3).map(|u| u.as_str().to_lowercase()) {
        Some(unit) => convert_measurement(&values, &unit),
        None if values.len() > 1 => values
            .iter()
            .map(|v| round_number(*v))
            .collect::<Vec<_>>()
            .join(" x "),
        None if whole.contains('.') => round_number(values[0]),
        None => whole.to_string(),
    }
}

/// The block converts as a whole, driven by its largest dimension as printed.
fn convert_measurement(values: &[f64], unit: &str) -> String {
    let largest = values.iter().cloned().fold(0.0_f64, f64::max);
    let shown_mm: f64 = one_decimal(largest).parse().unwrap_or(largest);
    let (scaled, unit): (Vec<f64>, &str) = match unit {
        "mm" if shown_mm >= 10.0 => (values.iter().map(|v| v / 10.0).collect(), "cm"),
        "cm" if largest < 0.1 => (values.iter().map(|v| v * 10.0).collect(), "mm"),
        other => (values.to_vec(), if other == "cm" { "cm" } else { "mm" }),
    };
    let dims = scaled
        .iter()
        .map(|v| one_decimal(*v))
        .collect::<Vec<_>>()
        .join(" x ");
    format!("{dims} {unit}")
}

/// One decimal place with a trailing `.0` dropped.
pub fn one_decimal(value: f64) -> String {
    let formatted = format!("{value:.1}");
    match formatted.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

/// One decimal below ten, nearest integer otherwise.
pub fn round_number(value: f64) -> String {
    if value.abs() < 10.0 {
        one_decimal(value)
    } else {
        format!("{}", value.round() as i64)
    }
}

/// Numbers glued to `.`, `/` or `-` and another digit belong to a date or code.
fn is_part_of_date(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let joined_after = end + 1 < bytes.len()
        && matches!(bytes[end], b'.' | b'/' | b'-')
        && bytes[end + 1].is_ascii_digit();
    let joined_before = start >= 2
        && matches!(bytes[start - 1], b'.' | b'/' | b'-')
        && bytes[start - 2].is_ascii_digit();
    joined_after || joined_before
}
