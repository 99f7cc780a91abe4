//! Application entry point for the `codemetal-simlog` analyzer.
//!
//! This binary orchestrates one offline analysis run over the logs of a
//! building simulation, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing (on stderr)
//! - Running the aggregation pipeline (config snapshot, telemetry pass,
//!   access-log pass, peak demand) via the `pipeline` gateway
//! - Printing the site report to stdout as text or JSON
//!
//! # Environment Variables
//! - `SIMLOG_CONFIG_PATH` (**required**) – simulation configuration snapshot
//! - `SIMLOG_TELEMETRY_LOG` (**required**) – simulator telemetry log
//! - `SIMLOG_ACCESS_LOG` (optional) – HTTP access log
//! - `SIMLOG_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `SIMLOG_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP) by
//! delegating configuration parsing to `config`, aggregation to `pipeline`,
//! and rendering to `report`.
use std::env;

use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod energy;
mod models;
mod pipeline;
mod report;

pub use config::{Config, OutputFormat};

use report::SiteReport;

// ---

fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let analysis = pipeline::run(&cfg).map_err(|e| {
        tracing::error!("Analysis aborted, no report produced: {:#}", e);
        e
    })?;

    let report = SiteReport::build(&analysis, cfg.comfort_band);
    match cfg.output {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}

// ---

/// Install the stderr log subscriber; stdout stays reserved for the report.
///
/// `RUST_LOG` wins over `SIMLOG_LOG_LEVEL`. `FORCE_COLOR` overrides TTY
/// detection, and `SIMLOG_SPAN_EVENTS=full|enter_exit` widens span output
/// beyond the close event of each pass.
fn init_tracing() {
    // ---
    let span_events = match env::var("SIMLOG_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SIMLOG_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
