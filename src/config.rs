//! Configuration loader for the `codemetal-simlog` analyzer.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Input paths and report tunables are resolved here
//! once so the pipeline never reads the environment itself.
use std::{env, fmt, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};

/// Parse an optional environment variable into any `FromStr` type with a default value.
macro_rules! parse_env_or {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required path environment variable.
macro_rules! require_env_path {
    ($var_name:expr) => {
        env::var($var_name)
            .map(PathBuf::from)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Report rendering selected by `SIMLOG_OUTPUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{}' (expected text|json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Simulation configuration snapshot (JSON document).
    pub config_path: PathBuf,

    /// Simulator telemetry log, one record per line.
    pub telemetry_log: PathBuf,

    /// HTTP access log; the correlation phase is skipped when unset.
    pub access_log: Option<PathBuf>,

    /// Half-width in °C of the comfort band around each room's expected temperature.
    pub comfort_band: f64,

    pub output: OutputFormat,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `SIMLOG_CONFIG_PATH` – simulation configuration snapshot
/// - `SIMLOG_TELEMETRY_LOG` – simulator telemetry log
///
/// Optional:
/// - `SIMLOG_ACCESS_LOG` – HTTP access log (default: none)
/// - `SIMLOG_COMFORT_BAND` – comfort band half-width in °C (default: 0.5)
/// - `SIMLOG_OUTPUT` – `text` or `json` (default: text)
///
/// Returns an error if any required variable is missing or any value is invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let config_path = require_env_path!("SIMLOG_CONFIG_PATH");
    let telemetry_log = require_env_path!("SIMLOG_TELEMETRY_LOG");
    let access_log = env::var("SIMLOG_ACCESS_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let comfort_band = parse_env_or!("SIMLOG_COMFORT_BAND", f64, 0.5);
    let output = parse_env_or!("SIMLOG_OUTPUT", OutputFormat, OutputFormat::Text);

    if !comfort_band.is_finite() || comfort_band < 0.0 {
        return Err(anyhow!(
            "Invalid SIMLOG_COMFORT_BAND: {} (must be a non-negative number)",
            comfort_band
        ));
    }

    Ok(Config {
        config_path,
        telemetry_log,
        access_log,
        comfort_band,
        output,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        let access_log = self
            .access_log
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  SIMLOG_CONFIG_PATH   : {}", self.config_path.display());
        tracing::info!("  SIMLOG_TELEMETRY_LOG : {}", self.telemetry_log.display());
        tracing::info!("  SIMLOG_ACCESS_LOG    : {}", access_log);
        tracing::info!("  SIMLOG_COMFORT_BAND  : {}", self.comfort_band);
        tracing::info!("  SIMLOG_OUTPUT        : {}", self.output);
    }
}
