//! Data models for the simulation log analyzer.

use serde_json::Value;

use crate::energy::parse_decimal;

// ---

/// Default expected temperature for a room, in °C.
pub const DEFAULT_EXPECTED_TEMP: f64 = 22.0;

/// Default rated energy capacity for a room, in kWh (`"2 kWh"`).
pub const DEFAULT_RATED_ENERGY_KWH: f64 = 2.0;

/// Static attributes of a room, taken from the configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomConfig {
    // ---
    pub expected_temp: f64,
    pub rated_energy_kwh: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            expected_temp: DEFAULT_EXPECTED_TEMP,
            rated_energy_kwh: DEFAULT_RATED_ENERGY_KWH,
        }
    }
}

/// One telemetry sample as embedded in a simulator log line.
///
/// Every field is optional: a record only counts as telemetry when both
/// `roomId` and `T_C` are present. Fields hold what this record observed;
/// the carried-forward values live in [`RoomStats`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TelemetryRecord {
    // ---
    pub room_id: Option<i64>,
    pub temp_c: Option<f64>,
    pub heater_on: Option<bool>,
    pub energy_wh: Option<f64>,
    pub low_kwh: Option<f64>,
    pub high_kwh: Option<f64>,
    pub sim_time_ms: Option<i64>,
}

impl TelemetryRecord {
    /// Read the telemetry fields out of a decoded log payload.
    ///
    /// A field of the wrong type reads as absent instead of rejecting the
    /// whole record.
    pub fn from_value(tree: &Value) -> Self {
        // ---
        Self {
            room_id: tree.get("roomId").and_then(lenient_i64),
            temp_c: tree.get("T_C").and_then(lenient_f64),
            heater_on: tree.get("heaterOn").and_then(lenient_bool),
            energy_wh: tree.get("energy_Wh").and_then(lenient_f64),
            low_kwh: tree.get("lowKWh").and_then(lenient_f64),
            high_kwh: tree.get("highKWh").and_then(lenient_f64),
            sim_time_ms: tree.get("simTimeMs").and_then(lenient_i64),
        }
    }
}

/// One HTTP access-log entry. Only the fields used for correlation are kept.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AccessRecord {
    // ---
    pub path: Option<String>,
    pub timestamp: Option<String>,
}

impl AccessRecord {
    pub fn from_value(tree: &Value) -> Self {
        Self {
            path: tree.get("path").and_then(lenient_text),
            timestamp: tree.get("@timestamp").and_then(lenient_text),
        }
    }
}

/// Number, or a string holding one (either decimal separator).
fn lenient_f64(v: &Value) -> Option<f64> {
    // ---
    let x = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s).ok(),
        _ => None,
    };
    x.filter(|x| x.is_finite())
}

/// Integer, integral float, or a string holding either.
fn lenient_i64(v: &Value) -> Option<i64> {
    // ---
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    if let Value::String(s) = v {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Some(i);
        }
    }
    lenient_f64(v)
        .filter(|x| x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64)
        .map(|x| x as i64)
}

/// Boolean, `"true"`/`"false"` in any case, or a number (non-zero is true).
fn lenient_bool(v: &Value) -> Option<bool> {
    // ---
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        _ => None,
    }
}

fn lenient_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(v.to_string()),
        _ => None,
    }
}

/// Running statistics for one room, accumulated over the telemetry and
/// access passes.
///
/// The `last_*` fields hold the last known value of each cumulative reading.
/// A record that omits a reading carries the last known value forward.
#[derive(Debug, Clone)]
pub struct RoomStats {
    // ---
    pub config: RoomConfig,

    /// Temperatures in log arrival order.
    pub temperature_samples: Vec<f64>,
    pub min_temp: f64,
    pub max_temp: f64,
    pub heater_on_count: u64,

    pub last_energy_wh: f64,
    pub last_low_kwh: f64,
    pub last_high_kwh: f64,
    pub total_low_kwh: f64,
    pub total_high_kwh: f64,
    pub low_ticks: u64,
    pub high_ticks: u64,

    pub user_interactions: u64,
}

impl RoomStats {
    // ---
    pub fn new(config: RoomConfig) -> Self {
        // ---
        Self {
            config,
            temperature_samples: Vec::new(),
            min_temp: f64::INFINITY,
            max_temp: f64::NEG_INFINITY,
            heater_on_count: 0,
            last_energy_wh: 0.0,
            last_low_kwh: 0.0,
            last_high_kwh: 0.0,
            total_low_kwh: 0.0,
            total_high_kwh: 0.0,
            low_ticks: 0,
            high_ticks: 0,
            user_interactions: 0,
        }
    }

    /// Record a temperature sample and update the running extrema.
    pub fn push_temperature(&mut self, temp: f64) {
        // ---
        self.temperature_samples.push(temp);
        self.min_temp = self.min_temp.min(temp);
        self.max_temp = self.max_temp.max(temp);
    }

    pub fn sample_count(&self) -> usize {
        self.temperature_samples.len()
    }

    /// Classify samples against `expected_temp ± band`.
    ///
    /// The band edges count as within.
    pub fn comfort_breakdown(&self, band: f64) -> ComfortBreakdown {
        // ---
        let expected = self.config.expected_temp;
        let mut breakdown = ComfortBreakdown::default();
        for &t in &self.temperature_samples {
            if (t - expected).abs() <= band {
                breakdown.within += 1;
            }
            if t < expected - band {
                breakdown.below += 1;
            }
            if t > expected + band {
                breakdown.above += 1;
            }
        }
        breakdown
    }
}

impl Default for RoomStats {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

/// Sample counts relative to a room's comfort band.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ComfortBreakdown {
    pub within: u64,
    pub below: u64,
    pub above: u64,
}

/// Site-wide figures collected across the run.
#[derive(Debug, Clone, Default)]
pub struct SiteSummary {
    // ---
    pub max_energy_budget_kwh: f64,
    pub total_lines_processed: u64,
    pub valid_telemetry_records: u64,
    /// Lines that carried a payload which failed to decode.
    pub malformed_lines: u64,
    pub min_sim_time_ms: Option<i64>,
    pub max_sim_time_ms: Option<i64>,
    pub peak_simultaneous_kwh: f64,
    /// First simulated instant at which the peak was reached.
    pub peak_sim_time_ms: Option<i64>,
}

impl SiteSummary {
    // ---
    pub fn observe_sim_time(&mut self, ms: i64) {
        // ---
        self.min_sim_time_ms = Some(self.min_sim_time_ms.map_or(ms, |cur| cur.min(ms)));
        self.max_sim_time_ms = Some(self.max_sim_time_ms.map_or(ms, |cur| cur.max(ms)));
    }

    /// Span between the earliest and latest simulated timestamps.
    ///
    /// `None` until a timestamp is seen, or if the span overflows `i64`.
    pub fn sim_duration_ms(&self) -> Option<i64> {
        match (self.min_sim_time_ms, self.max_sim_time_ms) {
            (Some(min), Some(max)) => max.checked_sub(min),
            _ => None,
        }
    }
}
