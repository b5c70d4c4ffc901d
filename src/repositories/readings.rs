use crate::db::DbPool;
use crate::error::Result;
use crate::models::{CircuitSeed, NewDevice, NewReading};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Write path of the store: device/circuit identity upserts, append-only
/// reading inserts, and raw-data retention cleanup.
#[derive(Clone)]
pub struct ReadingRepository {
    pool: DbPool,
}

impl ReadingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert the device or refresh its device-controlled attributes
    /// (name, address, firmware, status, last_seen). Returns the surrogate key.
    pub async fn upsert_device(&self, device: &NewDevice) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO devices (device_id, device_name, device_type, ip_address,
                                 mac_address, firmware_version, status, last_seen)
            VALUES ($1, $2, $3, $4, $5, $6, 'active', NOW())
            ON CONFLICT (device_id) DO UPDATE SET
                device_name = EXCLUDED.device_name,
                ip_address = EXCLUDED.ip_address,
                mac_address = EXCLUDED.mac_address,
                firmware_version = EXCLUDED.firmware_version,
                status = EXCLUDED.status,
                last_seen = EXCLUDED.last_seen
            RETURNING id
            "#,
        )
        .bind(&device.device_id)
        .bind(&device.device_name)
        .bind(&device.device_type)
        .bind(&device.ip_address)
        .bind(&device.mac_address)
        .bind(&device.firmware_version)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Provision a circuit if it does not exist yet. Existing rows are left
    /// untouched: names, amperage and the is_active flag belong to the user
    /// once edited, so seeding must never reset or re-enable them.
    pub async fn upsert_circuit(
        &self,
        device_id: i64,
        circuit_number: i32,
        seed: &CircuitSeed,
    ) -> Result<i64> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO circuits (device_id, circuit_number, circuit_name,
                                  circuit_description, circuit_type, max_amperage)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (device_id, circuit_number) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(device_id)
        .bind(circuit_number)
        .bind(&seed.circuit_name)
        .bind(&seed.circuit_description)
        .bind(&seed.circuit_type)
        .bind(seed.max_amperage)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(id);
        }

        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM circuits WHERE device_id = $1 AND circuit_number = $2",
        )
        .bind(device_id)
        .bind(circuit_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// circuit_number → circuit id for the device's active circuits.
    pub async fn circuit_map(&self, device_id: i64) -> Result<HashMap<i32, i64>> {
        let rows = sqlx::query_as::<_, (i32, i64)>(
            "SELECT circuit_number, id FROM circuits
             WHERE device_id = $1 AND is_active = TRUE",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Append one fact row. Constraint violations and connection loss
    /// propagate to the caller; a vanished data point must be visible there.
    pub async fn insert_reading(&self, reading: &NewReading) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO energy_readings (circuit_id, ts, voltage, current_amps,
                                         power_watts, energy_kwh, power_factor, frequency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reading.circuit_id)
        .bind(reading.ts)
        .bind(reading.voltage)
        .bind(reading.current_amps)
        .bind(reading.power_watts)
        .bind(reading.energy_kwh)
        .bind(reading.power_factor)
        .bind(reading.frequency)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete raw fact rows older than the cutoff. Rollup tables are kept
    /// indefinitely; only energy_readings is subject to retention.
    pub async fn purge_readings_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM energy_readings WHERE ts < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
