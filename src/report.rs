//! Report assembly for a finished analysis.
//!
//! [`SiteReport`] is a flat, serializable view of an [`Analysis`]: all the
//! percentages are computed here so the text and JSON renderings agree.

use std::fmt;

use chrono::Duration;
use serde::Serialize;

use crate::pipeline::Analysis;

// ---

#[derive(Debug, Clone, Serialize)]
pub struct ConfiguredRoom {
    pub room_id: i64,
    pub expected_temp: f64,
    pub rated_energy_kwh: f64,
}

/// Per-room block of the report.
#[derive(Debug, Clone, Serialize)]
pub struct RoomReport {
    // ---
    pub room_id: i64,
    pub expected_temp: f64,
    pub samples: usize,
    pub min_temp: f64,
    pub max_temp: f64,
    pub within_pct: f64,
    pub below_pct: f64,
    pub above_pct: f64,
    pub heater_on_pct: f64,
    pub energy_kwh: f64,
    pub user_interactions: u64,
    pub low_ticks: u64,
    pub low_tick_pct: f64,
    pub high_ticks: u64,
    pub high_tick_pct: f64,
    pub total_low_kwh: f64,
    pub total_high_kwh: f64,
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    // ---
    pub configured_rooms: Vec<ConfiguredRoom>,
    pub max_energy_budget_kwh: f64,
    pub total_lines_processed: u64,
    pub valid_telemetry_records: u64,
    pub malformed_lines: u64,
    pub sim_duration_ms: Option<i64>,
    pub peak_simultaneous_kwh: f64,
    pub peak_sim_time_ms: Option<i64>,
    /// Peak as a percentage of the site budget; 0 when no budget is set.
    pub peak_budget_pct: f64,
    pub comfort_band: f64,
    /// Rooms with at least one temperature sample, by ascending id.
    pub rooms: Vec<RoomReport>,
}

impl SiteReport {
    /// Derive the report from `analysis`, classifying temperatures against
    /// `expected ± comfort_band`.
    pub fn build(analysis: &Analysis, comfort_band: f64) -> Self {
        // ---
        let summary = &analysis.summary;

        let configured_rooms = analysis
            .configured
            .iter()
            .map(|(&room_id, cfg)| ConfiguredRoom {
                room_id,
                expected_temp: cfg.expected_temp,
                rated_energy_kwh: cfg.rated_energy_kwh,
            })
            .collect();

        let rooms = analysis
            .rooms
            .iter()
            .filter(|(_, st)| st.sample_count() > 0)
            .map(|(&room_id, st)| {
                let total = st.sample_count() as u64;
                let band = st.comfort_breakdown(comfort_band);
                let ticks = st.low_ticks + st.high_ticks;

                RoomReport {
                    room_id,
                    expected_temp: st.config.expected_temp,
                    samples: st.sample_count(),
                    min_temp: st.min_temp,
                    max_temp: st.max_temp,
                    within_pct: pct(band.within, total),
                    below_pct: pct(band.below, total),
                    above_pct: pct(band.above, total),
                    heater_on_pct: pct(st.heater_on_count, total),
                    energy_kwh: st.last_energy_wh / 1000.0,
                    user_interactions: st.user_interactions,
                    low_ticks: st.low_ticks,
                    low_tick_pct: pct(st.low_ticks, ticks),
                    high_ticks: st.high_ticks,
                    high_tick_pct: pct(st.high_ticks, ticks),
                    total_low_kwh: st.total_low_kwh,
                    total_high_kwh: st.total_high_kwh,
                }
            })
            .collect();

        let peak_budget_pct = if summary.max_energy_budget_kwh > 0.0 {
            summary.peak_simultaneous_kwh / summary.max_energy_budget_kwh * 100.0
        } else {
            0.0
        };

        Self {
            configured_rooms,
            max_energy_budget_kwh: summary.max_energy_budget_kwh,
            total_lines_processed: summary.total_lines_processed,
            valid_telemetry_records: summary.valid_telemetry_records,
            malformed_lines: summary.malformed_lines,
            sim_duration_ms: summary.sim_duration_ms(),
            peak_simultaneous_kwh: summary.peak_simultaneous_kwh,
            peak_sim_time_ms: summary.peak_sim_time_ms,
            peak_budget_pct,
            comfort_band,
            rooms,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// `3723000` -> `01h 02m 03s`. `None` when chrono cannot represent `ms`.
fn hms(ms: i64) -> Option<String> {
    // ---
    let d = Duration::try_milliseconds(ms)?;
    Some(format!(
        "{:02}h {:02}m {:02}s",
        d.num_hours(),
        d.num_minutes() % 60,
        d.num_seconds() % 60
    ))
}

impl fmt::Display for SiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        writeln!(f, "Configuration loaded:")?;
        for room in &self.configured_rooms {
            writeln!(
                f,
                "  - Room {} -> expectedTemp={:.1}°C, rated={:.2} kWh",
                room.room_id, room.expected_temp, room.rated_energy_kwh
            )?;
        }
        writeln!(f, "  - Site energy budget: {:.2} kWh", self.max_energy_budget_kwh)?;
        writeln!(f)?;

        writeln!(f, "Analysis summary:")?;
        writeln!(
            f,
            "Total lines processed: {} | Valid telemetry records: {} | Malformed: {}",
            self.total_lines_processed, self.valid_telemetry_records, self.malformed_lines
        )?;
        if let Some(ms) = self.sim_duration_ms {
            let secs = ms as f64 / 1000.0;
            match hms(ms) {
                Some(clock) => writeln!(f, "Simulated duration: {:.1} s ({})", secs, clock)?,
                None => writeln!(f, "Simulated duration: {:.1} s", secs)?,
            }
        }
        write!(
            f,
            "Peak simultaneous draw: {:.2} kWh ({:.2} / {:.2} -> {:.1}% of budget)",
            self.peak_simultaneous_kwh,
            self.peak_simultaneous_kwh,
            self.max_energy_budget_kwh,
            self.peak_budget_pct
        )?;
        if let Some(t) = self.peak_sim_time_ms {
            write!(f, " at t={} ms", t)?;
        }
        writeln!(f)?;

        for r in &self.rooms {
            writeln!(f)?;
            writeln!(f, "Room {}:", r.room_id)?;
            writeln!(f, "  - Expected: {:.1}°C", r.expected_temp)?;
            writeln!(
                f,
                "  - Temperature: min={:.2}°C / max={:.2}°C",
                r.min_temp, r.max_temp
            )?;
            writeln!(
                f,
                "  - Within expected band (±{}°C): {:.1}% | Below: {:.1}% | Above: {:.1}%",
                self.comfort_band, r.within_pct, r.below_pct, r.above_pct
            )?;
            writeln!(f, "  - Heater on: {:.1}%", r.heater_on_pct)?;
            writeln!(f, "  - Accumulated energy: {:.3} kWh", r.energy_kwh)?;
            writeln!(f, "  - User interactions (POST): {}", r.user_interactions)?;
            writeln!(
                f,
                "  - Low tariff: {:.1}% ({} ticks)",
                r.low_tick_pct, r.low_ticks
            )?;
            writeln!(
                f,
                "  - High tariff: {:.1}% ({} ticks)",
                r.high_tick_pct, r.high_ticks
            )?;
            writeln!(f, "  - Total low-tariff consumption: {:.3} kWh", r.total_low_kwh)?;
            writeln!(f, "  - Total high-tariff consumption: {:.3} kWh", r.total_high_kwh)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{RoomConfig, RoomStats, SiteSummary};
    use std::collections::BTreeMap;

    fn analysis() -> Analysis {
        // ---
        let cfg = RoomConfig {
            expected_temp: 22.0,
            rated_energy_kwh: 3.0,
        };
        let mut st = RoomStats::new(cfg);
        for t in [21.8, 22.9, 23.6] {
            st.push_temperature(t);
        }
        st.heater_on_count = 2;
        st.low_ticks = 1;
        st.high_ticks = 3;
        st.last_energy_wh = 1250.0;
        st.user_interactions = 2;

        let mut rooms = BTreeMap::new();
        rooms.insert(1, st);
        // Seen only in the access log: no samples, left out of the room blocks.
        rooms.insert(5, RoomStats::default());

        Analysis {
            configured: BTreeMap::from([(1, cfg)]),
            rooms,
            summary: SiteSummary {
                max_energy_budget_kwh: 10.0,
                total_lines_processed: 5,
                valid_telemetry_records: 3,
                malformed_lines: 1,
                min_sim_time_ms: Some(0),
                max_sim_time_ms: Some(3_723_000),
                peak_simultaneous_kwh: 3.0,
                peak_sim_time_ms: Some(1_000),
            },
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_room_percentages() {
        // ---
        let report = SiteReport::build(&analysis(), 0.5);
        assert_eq!(report.rooms.len(), 1);

        let r = &report.rooms[0];
        assert!(approx(r.within_pct, 100.0 / 3.0));
        assert!(approx(r.below_pct, 0.0));
        assert!(approx(r.above_pct, 200.0 / 3.0));
        assert!(approx(r.heater_on_pct, 200.0 / 3.0));
        assert!(approx(r.low_tick_pct, 25.0));
        assert!(approx(r.high_tick_pct, 75.0));
        assert!(approx(r.energy_kwh, 1.25));
        assert!(approx(report.peak_budget_pct, 30.0));
    }

    #[test]
    fn test_zero_budget_and_no_ticks() {
        // ---
        let mut a = analysis();
        a.summary.max_energy_budget_kwh = 0.0;
        if let Some(st) = a.rooms.get_mut(&1) {
            st.low_ticks = 0;
            st.high_ticks = 0;
        }
        let report = SiteReport::build(&a, 0.5);

        assert_eq!(report.peak_budget_pct, 0.0);
        assert_eq!(report.rooms[0].low_tick_pct, 0.0);
        assert_eq!(report.rooms[0].high_tick_pct, 0.0);
    }

    #[test]
    fn test_text_rendering() {
        // ---
        let text = SiteReport::build(&analysis(), 0.5).to_string();

        assert!(text.contains("  - Room 1 -> expectedTemp=22.0°C, rated=3.00 kWh"));
        assert!(text.contains("Total lines processed: 5 | Valid telemetry records: 3 | Malformed: 1"));
        assert!(text.contains("Simulated duration: 3723.0 s (01h 02m 03s)"));
        assert!(text.contains("Peak simultaneous draw: 3.00 kWh (3.00 / 10.00 -> 30.0% of budget) at t=1000 ms"));
        assert!(text.contains("Within expected band (±0.5°C): 33.3% | Below: 0.0% | Above: 66.7%"));
        assert!(text.contains("  - User interactions (POST): 2"));
        assert!(!text.contains("Room 5:"));
    }

    #[test]
    fn test_no_duration_without_sim_time() {
        // ---
        let mut a = analysis();
        a.summary.min_sim_time_ms = None;
        a.summary.max_sim_time_ms = None;
        let text = SiteReport::build(&a, 0.5).to_string();
        assert!(!text.contains("Simulated duration"));
    }

    #[test]
    fn test_json_rendering() {
        // ---
        let json = SiteReport::build(&analysis(), 0.5).to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["valid_telemetry_records"], 3);
        assert_eq!(v["rooms"][0]["room_id"], 1);
        assert_eq!(v["rooms"][0]["user_interactions"], 2);
        assert_eq!(v["sim_duration_ms"], 3_723_000);
    }

    #[test]
    fn test_hms() {
        // ---
        assert_eq!(hms(0).as_deref(), Some("00h 00m 00s"));
        assert_eq!(hms(59_999).as_deref(), Some("00h 00m 59s"));
        assert_eq!(hms(3_723_000).as_deref(), Some("01h 02m 03s"));
        assert_eq!(hms(i64::MIN), None);
    }

    #[test]
    fn test_extreme_sim_times_render() {
        // ---
        let mut a = analysis();
        a.summary.min_sim_time_ms = Some(i64::MIN);
        a.summary.max_sim_time_ms = Some(i64::MAX);
        let text = SiteReport::build(&a, 0.5).to_string();
        assert!(!text.contains("Simulated duration"));

        a.summary.min_sim_time_ms = Some(0);
        let text = SiteReport::build(&a, 0.5).to_string();
        assert!(text.contains("Simulated duration: "));
    }
}
