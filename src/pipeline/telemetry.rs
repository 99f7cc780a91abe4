//! Telemetry pass: per-room running statistics from the simulator log.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, info_span, trace};

use super::extract::extract_record;
use super::{for_each_line, AggregationContext};
use crate::models::TelemetryRecord;

// ---

/// Stream the telemetry log at `path` into `ctx`.
///
/// Fails only if the file cannot be opened or read; bad lines are counted
/// and skipped.
pub fn run_pass(ctx: &mut AggregationContext, path: &Path) -> Result<()> {
    // ---
    let _span = info_span!("telemetry_pass").entered();
    info!("Telemetry pass: reading {}", path.display());

    for_each_line(path, |line| {
        ctx.summary.total_lines_processed += 1;

        match extract_record(line) {
            Ok(tree) => {
                if !apply_record(ctx, &TelemetryRecord::from_value(&tree)) {
                    trace!("Record without roomId/T_C ignored");
                }
            }
            Err(e) => {
                if e.is_malformed() {
                    ctx.summary.malformed_lines += 1;
                    debug!("Skipping line {}: {}", ctx.summary.total_lines_processed, e);
                } else {
                    trace!("Skipping line {}: {}", ctx.summary.total_lines_processed, e);
                }
            }
        }
    })?;

    info!(
        "Telemetry pass complete: {} lines, {} valid records, {} malformed, {} rooms",
        ctx.summary.total_lines_processed,
        ctx.summary.valid_telemetry_records,
        ctx.summary.malformed_lines,
        ctx.rooms.len()
    );
    Ok(())
}

/// Fold one decoded record into the room and site state.
///
/// Returns `false` when the record lacks `roomId` or `T_C` and was ignored.
pub fn apply_record(ctx: &mut AggregationContext, record: &TelemetryRecord) -> bool {
    // ---
    let (Some(room_id), Some(temp)) = (record.room_id, record.temp_c) else {
        return false;
    };
    let heater_on = record.heater_on.unwrap_or(false);

    let st = ctx.room_mut(room_id);
    st.push_temperature(temp);
    if heater_on {
        st.heater_on_count += 1;
    }

    if let Some(wh) = record.energy_wh {
        st.last_energy_wh = wh;
    }

    // Absent counters carry the last known reading forward.
    let low = record.low_kwh.unwrap_or(st.last_low_kwh);
    let high = record.high_kwh.unwrap_or(st.last_high_kwh);

    // Each tier ticks on its own strict increase while heating.
    if heater_on {
        if low > st.last_low_kwh {
            st.low_ticks += 1;
        }
        if high > st.last_high_kwh {
            st.high_ticks += 1;
        }
    }

    st.last_low_kwh = low;
    st.last_high_kwh = high;
    st.total_low_kwh = low;
    st.total_high_kwh = high;

    if let Some(t) = record.sim_time_ms {
        ctx.summary.observe_sim_time(t);
        if heater_on {
            ctx.buckets.entry(t).or_default().insert(room_id);
        }
    }

    ctx.summary.valid_telemetry_records += 1;
    true
}
