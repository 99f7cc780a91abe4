//! Textual quantity parsing for configuration values.
//!
//! The simulation config writes energies as free text (`"2 kWh"`, `"500Wh"`,
//! `"3"`) and temperatures with either decimal separator (`"21,5"`). Both
//! parsers normalize to plain `f64`; energies always come back in kWh.

use std::num::ParseFloatError;

use thiserror::Error;

// ---

/// Failure to read a number out of a quantity string.
#[derive(Debug, Error)]
#[error("invalid quantity '{input}': {source}")]
pub struct QuantityParseError {
    pub input: String,
    #[source]
    pub source: ParseFloatError,
}

/// Parse an energy quantity into kilowatt-hours.
///
/// A `kwh` suffix (any case) is taken as-is, a bare `wh` suffix is divided by
/// 1000, and text with no unit is assumed to already be kWh.
pub fn parse_energy(text: &str) -> Result<f64, QuantityParseError> {
    // ---
    let clean = text.trim().replace(',', ".").to_lowercase();

    let (number, scale) = if let Some(prefix) = clean.strip_suffix("kwh") {
        (prefix, 1.0)
    } else if let Some(prefix) = clean.strip_suffix("wh") {
        (prefix, 1000.0)
    } else {
        (clean.as_str(), 1.0)
    };

    parse_number(number).map(|value| value / scale)
}

/// Parse a decimal number accepting either `.` or `,` as separator.
pub fn parse_decimal(text: &str) -> Result<f64, QuantityParseError> {
    // ---
    parse_number(&text.trim().replace(',', "."))
}

fn parse_number(text: &str) -> Result<f64, QuantityParseError> {
    // ---
    let text = text.trim();
    text.parse::<f64>().map_err(|source| QuantityParseError {
        input: text.to_string(),
        source,
    })
}
