//! Peak simultaneous demand across simulated instants.

use std::collections::BTreeMap;

use super::TimeBuckets;
use crate::models::RoomStats;

/// Largest simultaneous draw and the instant it occurred.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakDemand {
    pub kwh: f64,
    pub at_sim_time_ms: Option<i64>,
}

/// Sum the rated capacity of every heating room per instant and keep the max.
///
/// Uses each room's nameplate rating rather than its metered consumption.
/// Ties resolve to the earliest instant.
pub fn peak_demand(buckets: &TimeBuckets, rooms: &BTreeMap<i64, RoomStats>) -> PeakDemand {
    // ---
    let mut peak = PeakDemand::default();

    for (&t, active) in buckets {
        let kwh: f64 = active
            .iter()
            .filter_map(|id| rooms.get(id))
            .map(|st| st.config.rated_energy_kwh)
            .sum();

        let earlier_tie = kwh == peak.kwh && peak.at_sim_time_ms.map_or(true, |p| t < p);
        if kwh > peak.kwh || (kwh > 0.0 && earlier_tie) {
            peak = PeakDemand {
                kwh,
                at_sim_time_ms: Some(t),
            };
        }
    }
    peak
}
