use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)\s*([A-Za-z]*)\s*$")
        .expect("duration regex")
});

const UNITS: [(&str, f64); 5] = [
    ("d", 86_400_000.0),
    ("h", 3_600_000.0),
    ("m", 60_000.0),
    ("s", 1_000.0),
    ("ms", 1.0),
];

#[derive(Debug, Error, PartialEq)]
pub enum ParseDurationError {
    #[error("invalid duration '{0}' (expected e.g. 1500, 250ms, 1.5s, 24h)")]
    Invalid(String),
}

/// Parses `1500`, `250ms`, `1.5s`, `2m`, `24h` or `1d` into milliseconds.
/// A bare number is taken as milliseconds.
pub fn parse_millis(input: &str) -> Result<f64, ParseDurationError> {
    let invalid = || ParseDurationError::Invalid(input.to_string());
    let caps = DURATION_RE.captures(input).ok_or_else(invalid)?;
    let value: f64 = caps[1].parse().map_err(|_| invalid())?;
    let unit = caps[2].to_ascii_lowercase();
    if unit.is_empty() {
        return Ok(value);
    }
    let scale = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, scale)| *scale)
        .ok_or_else(invalid)?;
    Ok(value * scale)
}

/// Renders milliseconds in the largest unit that keeps the value >= 1.
pub fn format_millis(ms: f64) -> String {
    if !ms.is_finite() {
        return format!("{ms}");
    }
    let (name, scale) = UNITS
        .iter()
        .copied()
        .find(|(_, scale)| ms.abs() >= *scale)
        .unwrap_or(("ms", 1.0));
    let text = format!("{:.3}", ms / scale);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}{name}")
}
