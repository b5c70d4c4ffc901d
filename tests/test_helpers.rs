use chrono::{DateTime, Utc};
use energy_monitor::db::{self, DbPool};
use energy_monitor::models::{CircuitSeed, NewDevice};
use energy_monitor::repositories::ReadingRepository;
use sqlx::postgres::PgPoolOptions;

pub async fn create_test_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn setup_test_schema(pool: &DbPool) -> Result<(), energy_monitor::AppError> {
    db::init_schema(pool).await
}

/// Empties every table the pipeline writes. Billing rates are left alone so
/// the seeded schedule stays available to cost tests.
pub async fn cleanup_test_data(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "TRUNCATE TABLE energy_readings, energy_hourly, energy_daily, energy_costs,
                        circuits, devices RESTART IDENTITY CASCADE",
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_device(pool: &DbPool) -> Result<i64, energy_monitor::AppError> {
    let readings = ReadingRepository::new(pool.clone());
    readings
        .upsert_device(&NewDevice {
            device_id: "em16_test".to_string(),
            device_name: "Refoss EM16 test".to_string(),
            device_type: "EM16".to_string(),
            ip_address: "192.168.1.200".to_string(),
            mac_address: None,
            firmware_version: None,
        })
        .await
}

pub async fn seed_circuit(
    pool: &DbPool,
    device_db_id: i64,
    circuit_number: i32,
    name: &str,
) -> Result<i64, energy_monitor::AppError> {
    let readings = ReadingRepository::new(pool.clone());
    readings
        .upsert_circuit(
            device_db_id,
            circuit_number,
            &CircuitSeed {
                circuit_name: name.to_string(),
                circuit_description: None,
                circuit_type: "branch".to_string(),
                max_amperage: 60,
            },
        )
        .await
}

/// Bulk-insert an evenly spaced series of constant-power readings.
pub async fn insert_reading_series(
    pool: &DbPool,
    circuit_id: i64,
    start: DateTime<Utc>,
    count: i32,
    step_secs: i32,
    power_watts: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO energy_readings (circuit_id, ts, voltage, current_amps,
                                     power_watts, energy_kwh, power_factor, frequency)
        SELECT $1,
               $2 + (i * $3 || ' seconds')::interval,
               240.0,
               $4 / 240.0,
               $4,
               0.0,
               1.0,
               60.0
        FROM generate_series(0, $5 - 1) AS i
        "#,
    )
    .bind(circuit_id)
    .bind(start)
    .bind(step_secs)
    .bind(power_watts)
    .bind(count)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_hourly_row(
    pool: &DbPool,
    circuit_id: i64,
    hour_start: DateTime<Utc>,
    avg_power: f64,
    min_power: f64,
    max_power: f64,
    total_energy_kwh: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO energy_hourly (circuit_id, hour_start, avg_voltage, avg_current,
                                   avg_power, min_power, max_power, total_energy_kwh, sample_count)
        VALUES ($1, $2, 240.0, $3 / 240.0, $3, $4, $5, $6, 3600)
        ON CONFLICT (circuit_id, hour_start) DO UPDATE SET
            avg_power = EXCLUDED.avg_power,
            min_power = EXCLUDED.min_power,
            max_power = EXCLUDED.max_power,
            total_energy_kwh = EXCLUDED.total_energy_kwh
        "#,
    )
    .bind(circuit_id)
    .bind(hour_start)
    .bind(avg_power)
    .bind(min_power)
    .bind(max_power)
    .bind(total_energy_kwh)
    .execute(pool)
    .await?;
    Ok(())
}
