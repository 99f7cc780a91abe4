//! Access-log pass: attribute manual `/switch/{roomId}/...` requests to rooms.
//!
//! The HTTP front end may deliver the same request to the log more than once;
//! a request is identified by its path plus `@timestamp` and counted once.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, info_span, trace};

use super::{for_each_line, AggregationContext};
use crate::models::AccessRecord;

// ---

/// Substrings a line must contain before it is worth decoding.
pub const REQUIRED_FRAGMENTS: [&str; 3] = [
    r#""method":"POST""#,
    r#""path":"/switch/"#,
    r#""status":200"#,
];

const SWITCH_PREFIX: &str = "/switch/";

/// What happened to one access-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Not a successful switch POST.
    Filtered,
    /// Could not be decoded, or had no usable path, timestamp or room id.
    Malformed,
    /// Already counted under the same path and timestamp.
    Duplicate,
    /// Counted as a user interaction for this room.
    Counted(i64),
}

/// Dedup state for one access-log pass.
#[derive(Debug, Default)]
pub struct AccessCorrelator {
    seen: HashSet<String>,
}

impl AccessCorrelator {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Correlate one raw access-log line, updating `ctx` when it counts.
    pub fn ingest_line(&mut self, ctx: &mut AggregationContext, line: &str) -> Correlation {
        // ---
        if !REQUIRED_FRAGMENTS.iter().all(|f| line.contains(f)) {
            return Correlation::Filtered;
        }

        let record = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(tree) => AccessRecord::from_value(&tree),
            Err(e) => {
                trace!("Undecodable access line: {}", e);
                return Correlation::Malformed;
            }
        };
        self.ingest(ctx, &record)
    }

    /// Correlate an already decoded access record.
    pub fn ingest(&mut self, ctx: &mut AggregationContext, record: &AccessRecord) -> Correlation {
        // ---
        let path = record.path.as_deref().unwrap_or("");
        let timestamp = record.timestamp.as_deref().unwrap_or("");
        if !path.starts_with(SWITCH_PREFIX) || timestamp.is_empty() {
            return Correlation::Malformed;
        }

        let Some(room_id) = switch_room_id(path) else {
            debug!("No room id in switch path '{}'", path);
            return Correlation::Malformed;
        };

        if !self.seen.insert(dedup_key(path, timestamp)) {
            return Correlation::Duplicate;
        }

        ctx.room_mut(room_id).user_interactions += 1;
        Correlation::Counted(room_id)
    }

    pub fn unique_requests(&self) -> usize {
        self.seen.len()
    }
}

/// Stream the access log at `path` into `ctx`.
pub fn run_pass(ctx: &mut AggregationContext, path: &Path) -> Result<()> {
    // ---
    let _span = info_span!("access_pass").entered();
    info!("Access pass: analyzing HTTP interactions in {}", path.display());

    let mut correlator = AccessCorrelator::new();
    let (mut lines, mut duplicates, mut malformed) = (0u64, 0u64, 0u64);

    for_each_line(path, |line| {
        lines += 1;
        match correlator.ingest_line(ctx, line) {
            Correlation::Duplicate => duplicates += 1,
            Correlation::Malformed => malformed += 1,
            Correlation::Counted(room) => trace!("Switch request for room {}", room),
            Correlation::Filtered => {}
        }
    })?;

    info!(
        "Access pass complete: {} lines, {} switch requests, {} duplicates, {} malformed",
        lines,
        correlator.unique_requests(),
        duplicates,
        malformed
    );
    Ok(())
}

/// `/switch/{roomId}/...` -> `roomId`.
fn switch_room_id(path: &str) -> Option<i64> {
    path.split('/').nth(2)?.trim().parse().ok()
}

fn dedup_key(path: &str, timestamp: &str) -> String {
    format!("{}|{}", path, timestamp)
}
