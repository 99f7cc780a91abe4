//! Record extraction from raw simulator log lines.
//!
//! Simulator lines look like `2024-05-01 10:00:00 INFO sim - {"roomId":1,...}`:
//! free-form prefix text followed by a JSON object. Console echo lines are
//! tagged by the logger and never carry data.

use serde_json::Value;
use thiserror::Error;

/// Marker for lines the simulator's logger copied from its stdout.
pub const CONSOLE_MARKER: &str = r#""logger":"STDOUT""#;

/// Why a line produced no record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("console output line")]
    ConsoleLine,

    #[error("no structured payload on line")]
    NoPayload,

    #[error("payload failed to decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ExtractError {
    /// True when the line had a payload that could not be decoded.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Decode the trailing JSON object of a log line into a tree.
///
/// The payload starts at the last `{` on the line, so nested objects inside
/// the record are not supported. Truncated fragments surface as
/// [`ExtractError::Decode`]. Field types are not checked here.
pub fn extract_record(line: &str) -> Result<Value, ExtractError> {
    // ---
    if line.contains(CONSOLE_MARKER) {
        return Err(ExtractError::ConsoleLine);
    }

    let start = line.rfind('{').ok_or(ExtractError::NoPayload)?;
    Ok(serde_json::from_str(&line[start..])?)
}
