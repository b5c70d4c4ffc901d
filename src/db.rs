use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn connect(config: &DatabaseConfig) -> Result<DbPool> {
    let max_connections = config.max_connections.unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&config.url)
        .await?;

    Ok(pool)
}

/// Idempotent schema bootstrap. Uniqueness on the natural keys
/// (`devices.device_id`, `(device_id, circuit_number)`, `(circuit_id,
/// hour_start)`, `(circuit_id, day)`) is what makes device/circuit setup and
/// rollup recomputation safe to rerun.
pub async fn init_schema(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id BIGSERIAL PRIMARY KEY,
            device_id TEXT NOT NULL UNIQUE,
            device_name TEXT NOT NULL,
            device_type TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            mac_address TEXT,
            firmware_version TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            last_seen TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS circuits (
            id BIGSERIAL PRIMARY KEY,
            device_id BIGINT NOT NULL REFERENCES devices(id),
            circuit_number INT NOT NULL,
            circuit_name TEXT NOT NULL,
            circuit_description TEXT,
            circuit_type TEXT NOT NULL DEFAULT 'branch',
            max_amperage INT NOT NULL DEFAULT 60,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            UNIQUE (device_id, circuit_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS energy_readings (
            id BIGSERIAL PRIMARY KEY,
            circuit_id BIGINT NOT NULL REFERENCES circuits(id),
            ts TIMESTAMPTZ NOT NULL,
            voltage DOUBLE PRECISION NOT NULL,
            current_amps DOUBLE PRECISION NOT NULL,
            power_watts DOUBLE PRECISION NOT NULL,
            energy_kwh DOUBLE PRECISION NOT NULL,
            power_factor DOUBLE PRECISION NOT NULL,
            frequency DOUBLE PRECISION NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_energy_readings_circuit_ts
         ON energy_readings (circuit_id, ts)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS energy_hourly (
            id BIGSERIAL PRIMARY KEY,
            circuit_id BIGINT NOT NULL REFERENCES circuits(id),
            hour_start TIMESTAMPTZ NOT NULL,
            avg_voltage DOUBLE PRECISION NOT NULL,
            avg_current DOUBLE PRECISION NOT NULL,
            avg_power DOUBLE PRECISION NOT NULL,
            min_power DOUBLE PRECISION NOT NULL,
            max_power DOUBLE PRECISION NOT NULL,
            total_energy_kwh DOUBLE PRECISION NOT NULL,
            sample_count BIGINT NOT NULL,
            UNIQUE (circuit_id, hour_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS energy_daily (
            id BIGSERIAL PRIMARY KEY,
            circuit_id BIGINT NOT NULL REFERENCES circuits(id),
            day DATE NOT NULL,
            avg_voltage DOUBLE PRECISION NOT NULL,
            avg_current DOUBLE PRECISION NOT NULL,
            avg_power DOUBLE PRECISION NOT NULL,
            min_power DOUBLE PRECISION NOT NULL,
            max_power DOUBLE PRECISION NOT NULL,
            total_energy_kwh DOUBLE PRECISION NOT NULL,
            cost_estimate DOUBLE PRECISION,
            UNIQUE (circuit_id, day)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS energy_costs (
            id BIGSERIAL PRIMARY KEY,
            circuit_id BIGINT NOT NULL REFERENCES circuits(id),
            day DATE NOT NULL,
            on_peak_kwh DOUBLE PRECISION NOT NULL DEFAULT 0,
            off_peak_kwh DOUBLE PRECISION NOT NULL DEFAULT 0,
            super_off_peak_kwh DOUBLE PRECISION NOT NULL DEFAULT 0,
            on_peak_cost DOUBLE PRECISION NOT NULL DEFAULT 0,
            off_peak_cost DOUBLE PRECISION NOT NULL DEFAULT 0,
            super_off_peak_cost DOUBLE PRECISION NOT NULL DEFAULT 0,
            total_cost DOUBLE PRECISION NOT NULL DEFAULT 0,
            UNIQUE (circuit_id, day)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS billing_rates (
            id BIGSERIAL PRIMARY KEY,
            rate_name TEXT NOT NULL,
            rate_type TEXT NOT NULL,
            season TEXT NOT NULL DEFAULT 'all',
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            rate_per_kwh DOUBLE PRECISION NOT NULL,
            effective_date DATE NOT NULL DEFAULT CURRENT_DATE,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    seed_default_rates(pool).await?;

    Ok(())
}

/// Seed a time-of-use rate schedule the first time the table comes up empty.
/// A start_time equal to end_time means the window covers the whole day;
/// classification picks the most specific matching window (see rollup.rs).
async fn seed_default_rates(pool: &DbPool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM billing_rates")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let defaults: [(&str, &str, &str, &str, &str, f64); 6] = [
        ("Summer On-Peak", "on_peak", "summer", "16:00:00", "21:00:00", 0.45),
        ("Summer Super Off-Peak", "super_off_peak", "summer", "00:00:00", "06:00:00", 0.25),
        ("Summer Off-Peak", "off_peak", "summer", "00:00:00", "00:00:00", 0.38),
        ("Winter On-Peak", "on_peak", "winter", "16:00:00", "21:00:00", 0.40),
        ("Winter Super Off-Peak", "super_off_peak", "winter", "00:00:00", "06:00:00", 0.22),
        ("Winter Off-Peak", "off_peak", "winter", "00:00:00", "00:00:00", 0.33),
    ];

    for (name, rate_type, season, start, end, rate) in defaults {
        sqlx::query(
            r#"
            INSERT INTO billing_rates (rate_name, rate_type, season, start_time, end_time, rate_per_kwh)
            VALUES ($1, $2, $3, $4::time, $5::time, $6)
            "#,
        )
        .bind(name)
        .bind(rate_type)
        .bind(season)
        .bind(start)
        .bind(end)
        .bind(rate)
        .execute(pool)
        .await?;
    }

    tracing::info!("seeded default billing rate schedule");
    Ok(())
}
