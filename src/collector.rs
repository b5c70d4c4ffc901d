use crate::config::CollectorConfig;
use crate::device::DeviceClient;
use crate::error::{AppError, Result};
use crate::models::{CircuitSeed, NewDevice, NewReading};
use crate::normalize::NormalizedReading;
use crate::repositories::ReadingRepository;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Fixed catalog seeded on first run: 2 mains + 16 branches. Existing rows
/// are never overwritten, so user edits survive restarts.
pub const DEFAULT_CIRCUITS: [(i32, &str, &str, &str, i32); 18] = [
    (1, "Main Panel A", "Main electrical panel circuit A", "main", 200),
    (2, "Main Panel B", "Main electrical panel circuit B", "main", 200),
    (3, "Upstairs AC", "Upstairs air conditioning compressor", "branch", 60),
    (4, "Downstairs AC", "Downstairs air conditioning compressor", "branch", 60),
    (5, "Pool Pump", "Swimming pool pump and equipment", "branch", 60),
    (6, "Water Heater", "Electric water heater", "branch", 60),
    (7, "Dryer", "Electric clothes dryer", "branch", 60),
    (8, "Kitchen", "Kitchen appliances and outlets", "branch", 60),
    (9, "Living Room", "Living room lights and outlets", "branch", 60),
    (10, "Master Bedroom", "Master bedroom circuit", "branch", 60),
    (11, "Guest Rooms", "Guest bedroom circuits", "branch", 60),
    (12, "Garage", "Garage outlets and door opener", "branch", 60),
    (13, "Outdoor Lighting", "Exterior lighting", "branch", 60),
    (14, "Office", "Home office equipment", "branch", 60),
    (15, "Basement", "Basement lights and outlets", "branch", 60),
    (16, "EV Charger", "Electric vehicle charging station", "branch", 60),
    (17, "Spare 1", "Spare circuit 1", "branch", 60),
    (18, "Spare 2", "Spare circuit 2", "branch", 60),
];

/// Seed the default catalog for a device. Idempotent: rerunning creates no
/// duplicates and leaves existing (possibly user-edited) rows alone.
pub async fn provision_default_circuits(
    readings: &ReadingRepository,
    device_db_id: i64,
) -> Result<()> {
    for (number, name, description, circuit_type, max_amperage) in DEFAULT_CIRCUITS {
        readings
            .upsert_circuit(
                device_db_id,
                number,
                &CircuitSeed {
                    circuit_name: name.to_string(),
                    circuit_description: Some(description.to_string()),
                    circuit_type: circuit_type.to_string(),
                    max_amperage,
                },
            )
            .await?;
    }
    Ok(())
}

/// Attribute one tick's batch to a single snapshot timestamp and translate
/// circuit numbers into storage keys. Readings for numbers outside the
/// active map are dropped, one warning each, and never persisted.
pub fn translate_readings(
    batch: &[NormalizedReading],
    circuit_map: &HashMap<i32, i64>,
    snapshot_ts: DateTime<Utc>,
) -> Vec<NewReading> {
    batch
        .iter()
        .filter_map(|reading| match circuit_map.get(&reading.circuit_number) {
            Some(circuit_id) => Some(NewReading {
                circuit_id: *circuit_id,
                ts: snapshot_ts,
                voltage: reading.voltage,
                current_amps: reading.current,
                power_watts: reading.power,
                energy_kwh: reading.energy,
                power_factor: reading.power_factor,
                frequency: reading.frequency,
            }),
            None => {
                warn!(
                    circuit_number = reading.circuit_number,
                    "unknown circuit number; dropping reading"
                );
                None
            }
        })
        .collect()
}

/// Drives one device: initialize resolves identity and provisions circuits,
/// then the owning binary calls `tick` at the poll cadence. A tick never
/// takes the process down; storage-level failures surface as an Err the
/// caller logs before sleeping into the next tick.
pub struct Collector {
    device: DeviceClient,
    readings: ReadingRepository,
    cfg: CollectorConfig,
    circuit_map: HashMap<i32, i64>,
    last_purge: Option<DateTime<Utc>>,
}

impl Collector {
    /// INITIALIZING: upsert the device row, seed the default circuit catalog,
    /// build the circuit-number → key map. Failure here is fatal to startup;
    /// there is nothing sensible to collect without identity and mapping.
    pub async fn initialize(
        device: DeviceClient,
        readings: ReadingRepository,
        cfg: CollectorConfig,
    ) -> Result<Self> {
        let info = device.device_info().await;

        let device_db_id = readings
            .upsert_device(&NewDevice {
                device_id: device.device_id().to_string(),
                device_name: info
                    .name
                    .unwrap_or_else(|| format!("Refoss EM16 {}", device.ip())),
                device_type: "EM16".to_string(),
                ip_address: device.ip().to_string(),
                mac_address: info.mac,
                firmware_version: info.firmware,
            })
            .await?;

        provision_default_circuits(&readings, device_db_id).await?;

        let circuit_map = readings.circuit_map(device_db_id).await?;
        info!(
            device_db_id,
            circuits = circuit_map.len(),
            "collector setup complete"
        );

        Ok(Self {
            device,
            readings,
            cfg,
            circuit_map,
            last_purge: None,
        })
    }

    /// One poll-normalize-insert cycle. All readings of the batch share a
    /// single snapshot timestamp. Readings for circuit numbers outside the
    /// active map are dropped with a warning; a row rejected by the store's
    /// constraints is skipped; any other storage error aborts the remainder
    /// of the tick and is retried implicitly next tick.
    pub async fn tick(&mut self) -> Result<usize> {
        self.maybe_purge().await;

        let batch = self.device.fetch_readings().await;
        if batch.is_empty() {
            warn!("no data received from device");
            return Ok(0);
        }

        let rows = translate_readings(&batch, &self.circuit_map, Utc::now());
        let mut stored = 0usize;

        for row in &rows {
            match self.readings.insert_reading(row).await {
                Ok(()) => stored += 1,
                Err(AppError::Database(sqlx::Error::Database(e))) => {
                    warn!(circuit_id = row.circuit_id, error = %e, "reading rejected by store; dropping");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(count = stored, "collected readings");
        Ok(stored)
    }

    /// Retention cleanup, at most once per day. Raw fact rows only; rollup
    /// tiers are kept indefinitely. Failures are logged and retried on the
    /// next eligible tick.
    async fn maybe_purge(&mut self) {
        let now = Utc::now();
        if let Some(last) = self.last_purge {
            if now - last < Duration::hours(24) {
                return;
            }
        }
        self.last_purge = Some(now);

        let cutoff = now - Duration::days(self.cfg.retention_days);
        match self.readings.purge_readings_before(cutoff).await {
            Ok(deleted) => info!(deleted, "cleaned up old readings"),
            Err(e) => warn!("retention cleanup failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn translate_drops_readings_for_unmapped_circuits() {
        let map: HashMap<i32, i64> = [(1, 101), (2, 102)].into_iter().collect();
        let ts = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let batch = vec![
            NormalizedReading {
                circuit_number: 1,
                voltage: 240.0,
                current: 4.0,
                power: 960.0,
                energy: 1.0,
                power_factor: 1.0,
                frequency: 60.0,
            },
            NormalizedReading {
                circuit_number: 99,
                voltage: 240.0,
                current: 0.0,
                power: 0.0,
                energy: 0.0,
                power_factor: 1.0,
                frequency: 60.0,
            },
            NormalizedReading {
                circuit_number: 2,
                voltage: 120.0,
                current: 1.0,
                power: 120.0,
                energy: 0.5,
                power_factor: 0.9,
                frequency: 60.0,
            },
        ];

        let rows = translate_readings(&batch, &map, ts);
        assert_eq!(rows.len(), 2);
        // Circuit 99 is not in the map and must never reach the store.
        assert!(rows.iter().all(|r| r.circuit_id == 101 || r.circuit_id == 102));
        // The whole batch shares one snapshot timestamp.
        assert!(rows.iter().all(|r| r.ts == ts));
    }

    #[test]
    fn default_catalog_is_a_full_panel() {
        assert_eq!(DEFAULT_CIRCUITS.len(), 18);

        let mains = DEFAULT_CIRCUITS
            .iter()
            .filter(|(_, _, _, t, _)| *t == "main")
            .count();
        assert_eq!(mains, 2);

        // Circuit numbers are contiguous and unique: the seed upsert relies
        // on them as half of the natural key.
        let numbers: Vec<i32> = DEFAULT_CIRCUITS.iter().map(|(n, ..)| *n).collect();
        assert_eq!(numbers, (1..=18).collect::<Vec<_>>());

        for (_, _, _, circuit_type, max_amperage) in DEFAULT_CIRCUITS {
            assert!(matches!(circuit_type, "main" | "branch"));
            assert!(max_amperage > 0);
        }
    }
}
