//! Simulation configuration snapshot loader.
//!
//! Reads `units[].room.{id, expectedTemp, energy}` and
//! `simulacion.maxEnergy`. Text-valued quantities may also be written as bare
//! JSON numbers. Individual bad units are skipped or defaulted; only an
//! unreadable or non-JSON document fails the load.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::energy::{parse_decimal, parse_energy, QuantityParseError};
use crate::models::{RoomConfig, DEFAULT_EXPECTED_TEMP, DEFAULT_RATED_ENERGY_KWH};

// ---

/// Static site description loaded before any log is read.
#[derive(Debug, Clone, Default)]
pub struct SiteConfig {
    pub rooms: BTreeMap<i64, RoomConfig>,
    pub max_energy_kwh: f64,
}

/// Read and decode the configuration document at `path`.
pub fn load(path: &Path) -> Result<SiteConfig> {
    // ---
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'", path.display()))?;
    let root: Value = serde_json::from_str(&text)
        .with_context(|| format!("Configuration file '{}' is not valid JSON", path.display()))?;

    Ok(from_document(&root))
}

/// Build the site description from an already-decoded document.
pub fn from_document(root: &Value) -> SiteConfig {
    // ---
    let mut site = SiteConfig::default();

    if let Some(units) = root.get("units").and_then(|u| u.as_array()) {
        for (i, unit) in units.iter().enumerate() {
            let room = unit.get("room");
            let field = |name: &str| room.and_then(|r| r.get(name));
            let Some(id) = field("id").and_then(Value::as_i64) else {
                warn!("Skipping unit {}: missing integer room.id", i);
                continue;
            };

            let expected_temp = quantity_or(
                field("expectedTemp"),
                DEFAULT_EXPECTED_TEMP,
                parse_decimal,
            )
            .unwrap_or_else(|e| {
                warn!("Room {}: {}; using {}", id, e, DEFAULT_EXPECTED_TEMP);
                DEFAULT_EXPECTED_TEMP
            });
            let rated_energy_kwh =
                quantity_or(field("energy"), DEFAULT_RATED_ENERGY_KWH, parse_energy)
                    .unwrap_or_else(|e| {
                        warn!("Room {}: {}; using {} kWh", id, e, DEFAULT_RATED_ENERGY_KWH);
                        DEFAULT_RATED_ENERGY_KWH
                    });

            debug!(
                "Room {} configured: expected {} °C, rated {} kWh",
                id, expected_temp, rated_energy_kwh
            );
            site.rooms.insert(
                id,
                RoomConfig {
                    expected_temp,
                    rated_energy_kwh,
                },
            );
        }
    } else {
        warn!("Configuration has no 'units' array; no rooms preconfigured");
    }

    let max_energy = root.get("simulacion").and_then(|s| s.get("maxEnergy"));
    site.max_energy_kwh = quantity_or(max_energy, 0.0, parse_energy).unwrap_or_else(|e| {
        warn!("simulacion.maxEnergy: {}; using 0 kWh", e);
        0.0
    });

    site
}

/// Read a quantity that may be written as text or as a bare number.
///
/// Absent or null fields yield `default`.
fn quantity_or(
    field: Option<&Value>,
    default: f64,
    parse: fn(&str) -> Result<f64, QuantityParseError>,
) -> Result<f64, QuantityParseError> {
    // ---
    match field {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(default)),
        Some(Value::String(s)) => parse(s),
        Some(other) => parse(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_units_and_budget() {
        // ---
        let doc = json!({
            "units": [
                { "room": { "id": 1, "expectedTemp": "22.0", "energy": "3 kWh" } },
                { "room": { "id": 2, "expectedTemp": "20,5", "energy": "1500 Wh" } }
            ],
            "simulacion": { "maxEnergy": "10 kWh" }
        });
        let site = from_document(&doc);

        assert_eq!(site.rooms.len(), 2);
        assert_eq!(site.rooms[&1].expected_temp, 22.0);
        assert_eq!(site.rooms[&1].rated_energy_kwh, 3.0);
        assert_eq!(site.rooms[&2].expected_temp, 20.5);
        assert_eq!(site.rooms[&2].rated_energy_kwh, 1.5);
        assert_eq!(site.max_energy_kwh, 10.0);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        // ---
        let doc = json!({ "units": [ { "room": { "id": 4 } } ] });
        let site = from_document(&doc);

        assert_eq!(site.rooms[&4], RoomConfig::default());
        assert_eq!(site.max_energy_kwh, 0.0);
    }

    #[test]
    fn test_unit_without_id_is_skipped() {
        // ---
        let doc = json!({
            "units": [
                { "room": { "expectedTemp": "21" } },
                { "notARoom": true },
                { "room": { "id": "7" } },
                { "room": { "id": 8 } }
            ]
        });
        let site = from_document(&doc);

        assert_eq!(site.rooms.keys().copied().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn test_numeric_and_bad_quantities() {
        // ---
        let doc = json!({
            "units": [
                { "room": { "id": 1, "expectedTemp": 19.5, "energy": 4 } },
                { "room": { "id": 2, "expectedTemp": "tepid", "energy": "much" } }
            ],
            "simulacion": { "maxEnergy": 12 }
        });
        let site = from_document(&doc);

        assert_eq!(site.rooms[&1].expected_temp, 19.5);
        assert_eq!(site.rooms[&1].rated_energy_kwh, 4.0);
        assert_eq!(site.rooms[&2], RoomConfig::default());
        assert_eq!(site.max_energy_kwh, 12.0);
    }

    #[test]
    fn test_load_rejects_non_json() {
        // ---
        let path = std::env::temp_dir().join(format!("simlog-bad-config-{}.json", std::process::id()));
        fs::write(&path, "units: [not json").unwrap();
        let result = load(&path);
        fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        // ---
        let err = load(Path::new("/nonexistent/simlog/config.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration file"));
    }
}
