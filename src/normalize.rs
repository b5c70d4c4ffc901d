use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// One circuit's telemetry in the fixed shape the rest of the pipeline
/// consumes, regardless of which naming scheme the device used on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReading {
    pub circuit_number: i32,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub power_factor: f64,
    pub frequency: f64,
}

pub const DEFAULT_VOLTAGE: f64 = 240.0;
pub const DEFAULT_POWER_FACTOR: f64 = 1.0;
pub const DEFAULT_FREQUENCY: f64 = 60.0;

/// Container shapes observed across firmware revisions, tried in order:
/// a map keyed by `circuits`, a map keyed by `channels`, a bare list, or a
/// single circuit object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PayloadShape {
    Circuits { circuits: Vec<Value> },
    Channels { channels: Vec<Value> },
    List(Vec<Value>),
    Single(Map<String, Value>),
}

/// Normalize a device response body into per-circuit readings. Unrecognized
/// payloads yield an empty batch; they never abort the caller.
pub fn normalize_payload(payload: &Value) -> Vec<NormalizedReading> {
    let entries = match PayloadShape::deserialize(payload) {
        Ok(PayloadShape::Circuits { circuits }) => circuits,
        Ok(PayloadShape::Channels { channels }) => channels,
        Ok(PayloadShape::List(list)) => list,
        Ok(PayloadShape::Single(obj)) => vec![Value::Object(obj)],
        Err(_) => {
            warn!("unrecognized device payload shape; dropping response");
            return Vec::new();
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| normalize_entry(entry, i))
        .collect()
}

fn normalize_entry(entry: &Value, index: usize) -> Option<NormalizedReading> {
    let obj = match entry.as_object() {
        Some(obj) => obj,
        None => {
            warn!(index, "non-object circuit entry in device payload; skipping");
            return None;
        }
    };

    Some(NormalizedReading {
        circuit_number: pick_i64(obj, &["circuit", "channel"]).unwrap_or(index as i64 + 1) as i32,
        voltage: pick_f64(obj, &["voltage", "V"], DEFAULT_VOLTAGE),
        current: pick_f64(obj, &["current", "A", "amps"], 0.0),
        power: pick_f64(obj, &["power", "W", "watts"], 0.0),
        energy: pick_f64(obj, &["energy", "kWh", "kwh"], 0.0),
        power_factor: pick_f64(obj, &["power_factor", "pf"], DEFAULT_POWER_FACTOR),
        frequency: pick_f64(obj, &["frequency", "Hz"], DEFAULT_FREQUENCY),
    })
}

/// First key in `keys` that holds a numeric value wins; `default` otherwise.
fn pick_f64(obj: &Map<String, Value>, keys: &[&str], default: f64) -> f64 {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(value_as_f64))
        .unwrap_or(default)
}

fn pick_i64(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(value_as_f64))
        .map(|v| v as i64)
}

/// Devices emit numbers both bare and quoted; accept both.
fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn circuits_container_with_long_field_names() {
        let payload = json!({
            "circuits": [
                {"circuit": 3, "voltage": 239.5, "current": 4.2, "power": 1004.0,
                 "energy": 12.5, "power_factor": 0.95, "frequency": 59.9}
            ]
        });

        let readings = normalize_payload(&payload);
        assert_eq!(
            readings,
            vec![NormalizedReading {
                circuit_number: 3,
                voltage: 239.5,
                current: 4.2,
                power: 1004.0,
                energy: 12.5,
                power_factor: 0.95,
                frequency: 59.9,
            }]
        );
    }

    #[test]
    fn channels_container_with_short_field_names_applies_defaults() {
        let payload = json!({"channels": [{"channel": 1, "V": 120, "W": 500}]});

        let readings = normalize_payload(&payload);
        assert_eq!(
            readings,
            vec![NormalizedReading {
                circuit_number: 1,
                voltage: 120.0,
                current: 0.0,
                power: 500.0,
                energy: 0.0,
                power_factor: DEFAULT_POWER_FACTOR,
                frequency: DEFAULT_FREQUENCY,
            }]
        );
    }

    #[test]
    fn field_name_variants_normalize_identically() {
        let long = json!({"circuits": [{"circuit": 2, "voltage": 230.0, "current": 1.5,
            "power": 345.0, "energy": 7.0, "power_factor": 0.9, "frequency": 50.0}]});
        let short = json!({"channels": [{"channel": 2, "V": 230.0, "A": 1.5,
            "W": 345.0, "kWh": 7.0, "pf": 0.9, "Hz": 50.0}]});
        let aliased = json!([{"circuit": 2, "V": 230.0, "amps": 1.5,
            "watts": 345.0, "kwh": 7.0, "pf": 0.9, "Hz": 50.0}]);

        let a = normalize_payload(&long);
        let b = normalize_payload(&short);
        let c = normalize_payload(&aliased);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn bare_list_numbers_circuits_positionally() {
        let payload = json!([{"W": 100}, {"W": 200}, {"W": 300}]);

        let readings = normalize_payload(&payload);
        let numbers: Vec<i32> = readings.iter().map(|r| r.circuit_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(readings[1].power, 200.0);
        assert_eq!(readings[1].voltage, DEFAULT_VOLTAGE);
    }

    #[test]
    fn single_object_is_one_circuit() {
        let payload = json!({"circuit": 7, "power": 42.0});

        let readings = normalize_payload(&payload);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].circuit_number, 7);
        assert_eq!(readings[0].power, 42.0);
    }

    #[test]
    fn explicit_circuit_key_wins_over_position() {
        let payload = json!({"circuits": [{"circuit": 9, "W": 10}, {"W": 20}]});

        let readings = normalize_payload(&payload);
        assert_eq!(readings[0].circuit_number, 9);
        // No circuit/channel key: fall back to 1-based position.
        assert_eq!(readings[1].circuit_number, 2);
    }

    #[test]
    fn quoted_numbers_are_accepted() {
        let payload = json!({"channels": [{"channel": "4", "V": "121.3", "W": "850"}]});

        let readings = normalize_payload(&payload);
        assert_eq!(readings[0].circuit_number, 4);
        assert_eq!(readings[0].voltage, 121.3);
        assert_eq!(readings[0].power, 850.0);
    }

    #[test]
    fn unrecognized_payloads_yield_empty_batch() {
        assert!(normalize_payload(&json!("not telemetry")).is_empty());
        assert!(normalize_payload(&json!(42)).is_empty());
        assert!(normalize_payload(&json!(null)).is_empty());
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let payload = json!({"circuits": [{"circuit": 1, "W": 10}, "garbage", {"circuit": 3, "W": 30}]});

        let readings = normalize_payload(&payload);
        let numbers: Vec<i32> = readings.iter().map(|r| r.circuit_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn non_numeric_field_values_fall_back_to_defaults() {
        let payload = json!({"channels": [{"channel": 1, "V": {"nested": true}, "W": [1, 2]}]});

        let readings = normalize_payload(&payload);
        assert_eq!(readings[0].voltage, DEFAULT_VOLTAGE);
        assert_eq!(readings[0].power, 0.0);
    }
}
