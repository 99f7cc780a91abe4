//! Aggregation pipeline gateway.
//!
//! Runs the phases strictly in order: configuration snapshot, telemetry
//! pass, optional access-log pass, then peak demand. All mutable state lives
//! in one [`AggregationContext`] owned by [`run`] and lent to each pass.
//! Sibling modules stay internal; `main.rs` only sees [`run`] and
//! [`Analysis`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::{RoomConfig, RoomStats, SiteSummary};
use crate::Config;

mod access;
mod extract;
mod peak;
mod site_config;
mod telemetry;

use site_config::SiteConfig;

// ---

/// Simulated instant (ms) -> rooms whose heater was on at that instant.
pub type TimeBuckets = HashMap<i64, BTreeSet<i64>>;

/// Mutable state shared by the log passes of one run.
#[derive(Debug, Default)]
pub struct AggregationContext {
    // ---
    pub rooms: BTreeMap<i64, RoomStats>,
    pub summary: SiteSummary,
    buckets: TimeBuckets,
}

impl AggregationContext {
    // ---
    /// Seed one room entry per configured room.
    pub fn new(site: &SiteConfig) -> Self {
        // ---
        Self {
            rooms: site
                .rooms
                .iter()
                .map(|(&id, &cfg)| (id, RoomStats::new(cfg)))
                .collect(),
            summary: SiteSummary {
                max_energy_budget_kwh: site.max_energy_kwh,
                ..SiteSummary::default()
            },
            buckets: TimeBuckets::new(),
        }
    }

    /// Room entry for `id`, created with default attributes on first reference.
    pub fn room_mut(&mut self, id: i64) -> &mut RoomStats {
        self.rooms.entry(id).or_default()
    }

    /// Compute peak demand and release the time buckets.
    pub fn finish(self, site: SiteConfig) -> Analysis {
        // ---
        let Self {
            rooms,
            mut summary,
            buckets,
        } = self;

        let peak = peak::peak_demand(&buckets, &rooms);
        info!(
            "Peak demand: {:.2} kWh over {} heating instants",
            peak.kwh,
            buckets.len()
        );
        summary.peak_simultaneous_kwh = peak.kwh;
        summary.peak_sim_time_ms = peak.at_sim_time_ms;

        Analysis {
            configured: site.rooms,
            rooms,
            summary,
        }
    }
}

/// Final, read-only result of a run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Rooms as declared in the configuration snapshot.
    pub configured: BTreeMap<i64, RoomConfig>,
    pub rooms: BTreeMap<i64, RoomStats>,
    pub summary: SiteSummary,
}

/// Execute every phase against the files named in `cfg`.
///
/// Fails if the configuration snapshot or telemetry log cannot be read. A
/// missing or unreadable access log only skips that phase.
pub fn run(cfg: &Config) -> Result<Analysis> {
    // ---
    let site = site_config::load(&cfg.config_path)?;
    info!(
        "Loaded {} rooms, site budget {:.2} kWh",
        site.rooms.len(),
        site.max_energy_kwh
    );

    let mut ctx = AggregationContext::new(&site);
    telemetry::run_pass(&mut ctx, &cfg.telemetry_log)?;

    match &cfg.access_log {
        Some(path) if path.is_file() => {
            if let Err(e) = access::run_pass(&mut ctx, path) {
                warn!("Access log pass aborted: {:#}", e);
            }
        }
        Some(path) => warn!(
            "Access log '{}' not found, skipping POST analysis",
            path.display()
        ),
        None => info!("No access log configured, skipping POST analysis"),
    }

    Ok(ctx.finish(site))
}

/// Call `f` with each line of the file at `path`, without the line terminator.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the read.
fn for_each_line(path: &Path, mut f: impl FnMut(&str)) -> Result<()> {
    // ---
    let file =
        File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        f(line.trim_end_matches(|c: char| c == '\n' || c == '\r'));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::TelemetryRecord;

    fn heating(room: i64, t: i64) -> TelemetryRecord {
        TelemetryRecord {
            room_id: Some(room),
            temp_c: Some(21.0),
            heater_on: Some(true),
            sim_time_ms: Some(t),
            ..Default::default()
        }
    }

    #[test]
    fn test_context_seeded_from_site() {
        // ---
        let mut site = SiteConfig {
            max_energy_kwh: 7.5,
            ..SiteConfig::default()
        };
        site.rooms.insert(
            1,
            RoomConfig {
                expected_temp: 21.0,
                rated_energy_kwh: 3.0,
            },
        );
        let ctx = AggregationContext::new(&site);

        assert_eq!(ctx.rooms.len(), 1);
        assert_eq!(ctx.rooms[&1].config.rated_energy_kwh, 3.0);
        assert_eq!(ctx.summary.max_energy_budget_kwh, 7.5);
    }

    #[test]
    fn test_finish_computes_peak() {
        // ---
        let mut site = SiteConfig::default();
        for (id, kwh) in [(1, 2.0), (2, 3.0)] {
            site.rooms.insert(
                id,
                RoomConfig {
                    expected_temp: 22.0,
                    rated_energy_kwh: kwh,
                },
            );
        }
        let mut ctx = AggregationContext::new(&site);
        for rec in [heating(1, 100), heating(2, 100), heating(2, 200)] {
            telemetry::apply_record(&mut ctx, &rec);
        }
        let analysis = ctx.finish(site);

        assert_eq!(analysis.summary.peak_simultaneous_kwh, 5.0);
        assert_eq!(analysis.summary.peak_sim_time_ms, Some(100));
        assert_eq!(analysis.configured.len(), 2);
    }

    #[test]
    fn test_for_each_line_strips_terminators() {
        // ---
        let path = std::env::temp_dir().join(format!("simlog-lines-{}.log", std::process::id()));
        std::fs::write(&path, b"one\r\ntwo\n\xffthree").unwrap();

        let mut lines = Vec::new();
        for_each_line(&path, |l| lines.push(l.to_string())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(lines, vec!["one", "two", "\u{fffd}three"]);
    }

    #[test]
    fn test_for_each_line_missing_file() {
        // ---
        assert!(for_each_line(Path::new("/nonexistent/simlog.log"), |_| {}).is_err());
    }
}
