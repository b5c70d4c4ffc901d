use crate::db::DbPool;
use crate::error::Result;
use crate::models::Circuit;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Latest reading joined onto its circuit; reading columns are null for a
/// circuit that has not reported yet.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CircuitSnapshot {
    pub id: i64,
    pub circuit_number: i32,
    pub circuit_name: String,
    pub circuit_description: Option<String>,
    pub circuit_type: String,
    pub max_amperage: i32,
    pub voltage: Option<f64>,
    pub current_amps: Option<f64>,
    pub power_watts: Option<f64>,
    pub energy_kwh: Option<f64>,
    pub power_factor: Option<f64>,
    pub frequency: Option<f64>,
    pub ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HourlyPoint {
    pub circuit_name: String,
    pub hour_start: DateTime<Utc>,
    pub avg_power: f64,
    pub total_energy_kwh: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyUsageRow {
    pub day: NaiveDate,
    pub total_energy: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CostBucketTotals {
    pub on_peak_cost: f64,
    pub off_peak_cost: f64,
    pub super_off_peak_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyCostRow {
    pub month: NaiveDate,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopCircuitRow {
    pub circuit_name: String,
    pub circuit_cost: f64,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeviceStatusRow {
    pub device_name: String,
    pub ip_address: String,
    pub status: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub firmware_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngestStats {
    pub total_readings: i64,
    pub active_circuits: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExportDailyRow {
    pub circuit_name: String,
    pub day: NaiveDate,
    pub total_energy_kwh: f64,
    pub avg_power: f64,
    pub max_power: f64,
    pub cost_estimate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExportHourlyRow {
    pub circuit_name: String,
    pub hour_start: DateTime<Utc>,
    pub avg_power: f64,
    pub total_energy_kwh: f64,
    pub sample_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExportRawRow {
    pub circuit_name: String,
    pub ts: DateTime<Utc>,
    pub voltage: f64,
    pub current_amps: f64,
    pub power_watts: f64,
    pub energy_kwh: f64,
    pub power_factor: f64,
    pub frequency: f64,
}

/// Raw exports are bounded regardless of the requested range.
pub const RAW_EXPORT_CAP: i64 = 10_000;

/// Read-only queries behind the dashboard API. Never writes.
#[derive(Clone)]
pub struct DashboardRepository {
    pool: DbPool,
}

impl DashboardRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn realtime_circuits(&self) -> Result<Vec<CircuitSnapshot>> {
        let rows = sqlx::query_as::<_, CircuitSnapshot>(
            r#"
            SELECT c.id, c.circuit_number, c.circuit_name, c.circuit_description,
                   c.circuit_type, c.max_amperage,
                   r.voltage, r.current_amps, r.power_watts, r.energy_kwh,
                   r.power_factor, r.frequency, r.ts
            FROM circuits c
            LEFT JOIN LATERAL (
                SELECT voltage, current_amps, power_watts, energy_kwh,
                       power_factor, frequency, ts
                FROM energy_readings
                WHERE circuit_id = c.id
                ORDER BY ts DESC
                LIMIT 1
            ) r ON TRUE
            WHERE c.is_active = TRUE
            ORDER BY c.circuit_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Energy accumulated since `day_start`, from the hourly tier.
    pub async fn energy_since(&self, day_start: DateTime<Utc>) -> Result<f64> {
        let total = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(total_energy_kwh), 0) FROM energy_hourly WHERE hour_start >= $1",
        )
        .bind(day_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn cost_for_day(&self, day: NaiveDate) -> Result<f64> {
        let total = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(total_cost), 0) FROM energy_costs WHERE day = $1",
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn hourly_history(&self, since: DateTime<Utc>) -> Result<Vec<HourlyPoint>> {
        let rows = sqlx::query_as::<_, HourlyPoint>(
            r#"
            SELECT c.circuit_name, eh.hour_start, eh.avg_power, eh.total_energy_kwh
            FROM energy_hourly eh
            JOIN circuits c ON eh.circuit_id = c.id
            WHERE eh.hour_start >= $1 AND c.is_active = TRUE
            ORDER BY eh.hour_start, c.circuit_number
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn daily_usage(&self, since: NaiveDate) -> Result<Vec<DailyUsageRow>> {
        let rows = sqlx::query_as::<_, DailyUsageRow>(
            r#"
            SELECT day,
                   COALESCE(SUM(total_energy_kwh), 0) AS total_energy,
                   COALESCE(SUM(cost_estimate), 0) AS total_cost
            FROM energy_daily
            WHERE day >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn cost_day_totals(&self, day: NaiveDate) -> Result<CostBucketTotals> {
        let totals = sqlx::query_as::<_, CostBucketTotals>(
            r#"
            SELECT COALESCE(SUM(on_peak_cost), 0) AS on_peak_cost,
                   COALESCE(SUM(off_peak_cost), 0) AS off_peak_cost,
                   COALESCE(SUM(super_off_peak_cost), 0) AS super_off_peak_cost,
                   COALESCE(SUM(total_cost), 0) AS total_cost
            FROM energy_costs
            WHERE day = $1
            "#,
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    pub async fn monthly_costs(&self, since: NaiveDate) -> Result<Vec<MonthlyCostRow>> {
        let rows = sqlx::query_as::<_, MonthlyCostRow>(
            r#"
            SELECT date_trunc('month', day)::date AS month,
                   COALESCE(SUM(total_cost), 0) AS monthly_cost
            FROM energy_costs
            WHERE day >= $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn top_circuits(&self, day: NaiveDate, limit: i64) -> Result<Vec<TopCircuitRow>> {
        let rows = sqlx::query_as::<_, TopCircuitRow>(
            r#"
            SELECT c.circuit_name,
                   COALESCE(SUM(ec.total_cost), 0) AS circuit_cost,
                   COALESCE(SUM(ec.on_peak_kwh + ec.off_peak_kwh + ec.super_off_peak_kwh), 0) AS total_kwh
            FROM energy_costs ec
            JOIN circuits c ON ec.circuit_id = c.id
            WHERE ec.day = $1
            GROUP BY c.id, c.circuit_name
            ORDER BY circuit_cost DESC
            LIMIT $2
            "#,
        )
        .bind(day)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn circuits(&self) -> Result<Vec<Circuit>> {
        let rows = sqlx::query_as::<_, Circuit>(
            r#"
            SELECT id, device_id, circuit_number, circuit_name, circuit_description,
                   circuit_type, max_amperage, is_active
            FROM circuits
            ORDER BY circuit_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns false when no circuit has this id.
    pub async fn update_circuit(
        &self,
        id: i64,
        circuit_name: &str,
        circuit_description: Option<&str>,
        max_amperage: i32,
        is_active: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE circuits
            SET circuit_name = $1,
                circuit_description = $2,
                max_amperage = $3,
                is_active = $4
            WHERE id = $5
            "#,
        )
        .bind(circuit_name)
        .bind(circuit_description)
        .bind(max_amperage)
        .bind(is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn devices_status(&self) -> Result<Vec<DeviceStatusRow>> {
        let rows = sqlx::query_as::<_, DeviceStatusRow>(
            r#"
            SELECT device_name, ip_address, status, last_seen, firmware_version
            FROM devices
            ORDER BY last_seen DESC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn last_reading_ts(&self) -> Result<Option<DateTime<Utc>>> {
        let ts = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(ts) FROM energy_readings",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ts)
    }

    pub async fn ingest_stats(&self, since: DateTime<Utc>) -> Result<IngestStats> {
        let stats = sqlx::query_as::<_, IngestStats>(
            r#"
            SELECT COUNT(*) AS total_readings,
                   COUNT(DISTINCT circuit_id) AS active_circuits
            FROM energy_readings
            WHERE ts > $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    pub async fn export_daily(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ExportDailyRow>> {
        let rows = sqlx::query_as::<_, ExportDailyRow>(
            r#"
            SELECT c.circuit_name, ed.day, ed.total_energy_kwh, ed.avg_power,
                   ed.max_power, ed.cost_estimate
            FROM energy_daily ed
            JOIN circuits c ON ed.circuit_id = c.id
            WHERE ed.day BETWEEN $1 AND $2
            ORDER BY ed.day, c.circuit_number
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn export_hourly(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ExportHourlyRow>> {
        let rows = sqlx::query_as::<_, ExportHourlyRow>(
            r#"
            SELECT c.circuit_name, eh.hour_start, eh.avg_power,
                   eh.total_energy_kwh, eh.sample_count
            FROM energy_hourly eh
            JOIN circuits c ON eh.circuit_id = c.id
            WHERE eh.hour_start::date BETWEEN $1 AND $2
            ORDER BY eh.hour_start, c.circuit_number
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn export_raw(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ExportRawRow>> {
        let rows = sqlx::query_as::<_, ExportRawRow>(
            r#"
            SELECT c.circuit_name, er.ts, er.voltage, er.current_amps,
                   er.power_watts, er.energy_kwh, er.power_factor, er.frequency
            FROM energy_readings er
            JOIN circuits c ON er.circuit_id = c.id
            WHERE er.ts::date BETWEEN $1 AND $2
            ORDER BY er.ts, c.circuit_number
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(RAW_EXPORT_CAP)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
