use crate::db::DbPool;
use crate::error::Result;
use crate::models::CircuitDayCost;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

/// One hourly bucket as consumed by the cost step.
#[derive(Debug, Clone, FromRow)]
pub struct HourlyEnergy {
    pub circuit_id: i64,
    pub hour_start: DateTime<Utc>,
    pub total_energy_kwh: f64,
}

/// Write path of the rollup tiers. Every statement here is an upsert keyed by
/// the tier's natural key, so recomputing a window overwrites instead of
/// accumulating.
#[derive(Clone)]
pub struct RollupRepository {
    pool: DbPool,
}

impl RollupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fold raw readings in `[hour_start, hour_end)` into energy_hourly.
    /// Energy integrates power over the configured sample spacing:
    /// SUM(power_watts) * Δt / 3.6e6 → kWh. Returns upserted circuit count.
    pub async fn rollup_hour(
        &self,
        hour_start: DateTime<Utc>,
        hour_end: DateTime<Utc>,
        sample_interval_secs: f64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO energy_hourly (circuit_id, hour_start, avg_voltage, avg_current,
                                       avg_power, min_power, max_power, total_energy_kwh,
                                       sample_count)
            SELECT circuit_id,
                   $1,
                   AVG(voltage),
                   AVG(current_amps),
                   AVG(power_watts),
                   MIN(power_watts),
                   MAX(power_watts),
                   SUM(power_watts) * $3 / 3600000.0,
                   COUNT(*)
            FROM energy_readings
            WHERE ts >= $1 AND ts < $2
            GROUP BY circuit_id
            ON CONFLICT (circuit_id, hour_start) DO UPDATE SET
                avg_voltage = EXCLUDED.avg_voltage,
                avg_current = EXCLUDED.avg_current,
                avg_power = EXCLUDED.avg_power,
                min_power = EXCLUDED.min_power,
                max_power = EXCLUDED.max_power,
                total_energy_kwh = EXCLUDED.total_energy_kwh,
                sample_count = EXCLUDED.sample_count
            "#,
        )
        .bind(hour_start)
        .bind(hour_end)
        .bind(sample_interval_secs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Fold the day's hourly buckets into energy_daily. Derives strictly from
    /// energy_hourly, never from raw readings, so the cost is O(24) rows per
    /// circuit regardless of raw retention.
    pub async fn rollup_day(&self, day: NaiveDate) -> Result<u64> {
        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + chrono::Duration::days(1);

        let result = sqlx::query(
            r#"
            INSERT INTO energy_daily (circuit_id, day, avg_voltage, avg_current,
                                      avg_power, min_power, max_power, total_energy_kwh)
            SELECT circuit_id,
                   $1,
                   AVG(avg_voltage),
                   AVG(avg_current),
                   AVG(avg_power),
                   MIN(min_power),
                   MAX(max_power),
                   SUM(total_energy_kwh)
            FROM energy_hourly
            WHERE hour_start >= $2 AND hour_start < $3
            GROUP BY circuit_id
            ON CONFLICT (circuit_id, day) DO UPDATE SET
                avg_voltage = EXCLUDED.avg_voltage,
                avg_current = EXCLUDED.avg_current,
                avg_power = EXCLUDED.avg_power,
                min_power = EXCLUDED.min_power,
                max_power = EXCLUDED.max_power,
                total_energy_kwh = EXCLUDED.total_energy_kwh
            "#,
        )
        .bind(day)
        .bind(day_start)
        .bind(day_end)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn hourly_for_day(&self, day: NaiveDate) -> Result<Vec<HourlyEnergy>> {
        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + chrono::Duration::days(1);

        let rows = sqlx::query_as::<_, HourlyEnergy>(
            r#"
            SELECT circuit_id, hour_start, total_energy_kwh
            FROM energy_hourly
            WHERE hour_start >= $1 AND hour_start < $2
            ORDER BY circuit_id, hour_start
            "#,
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Upsert the day's cost records and mirror the total into
    /// energy_daily.cost_estimate, atomically for the whole day.
    pub async fn upsert_day_costs(&self, day: NaiveDate, costs: &[CircuitDayCost]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for cost in costs {
            sqlx::query(
                r#"
                INSERT INTO energy_costs (circuit_id, day, on_peak_kwh, off_peak_kwh,
                                          super_off_peak_kwh, on_peak_cost, off_peak_cost,
                                          super_off_peak_cost, total_cost)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (circuit_id, day) DO UPDATE SET
                    on_peak_kwh = EXCLUDED.on_peak_kwh,
                    off_peak_kwh = EXCLUDED.off_peak_kwh,
                    super_off_peak_kwh = EXCLUDED.super_off_peak_kwh,
                    on_peak_cost = EXCLUDED.on_peak_cost,
                    off_peak_cost = EXCLUDED.off_peak_cost,
                    super_off_peak_cost = EXCLUDED.super_off_peak_cost,
                    total_cost = EXCLUDED.total_cost
                "#,
            )
            .bind(cost.circuit_id)
            .bind(day)
            .bind(cost.on_peak_kwh)
            .bind(cost.off_peak_kwh)
            .bind(cost.super_off_peak_kwh)
            .bind(cost.on_peak_cost)
            .bind(cost.off_peak_cost)
            .bind(cost.super_off_peak_cost)
            .bind(cost.total_cost())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE energy_daily SET cost_estimate = $1 WHERE circuit_id = $2 AND day = $3",
            )
            .bind(cost.total_cost())
            .bind(cost.circuit_id)
            .bind(day)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
