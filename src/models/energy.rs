use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Immutable fact row, one per circuit per poll tick. Never updated.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub circuit_id: i64,
    pub ts: DateTime<Utc>,
    pub voltage: f64,
    pub current_amps: f64,
    pub power_watts: f64,
    pub energy_kwh: f64,
    pub power_factor: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HourlyRollup {
    pub circuit_id: i64,
    pub hour_start: DateTime<Utc>,
    pub avg_voltage: f64,
    pub avg_current: f64,
    pub avg_power: f64,
    pub min_power: f64,
    pub max_power: f64,
    pub total_energy_kwh: f64,
    pub sample_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyRollup {
    pub circuit_id: i64,
    pub day: NaiveDate,
    pub avg_voltage: f64,
    pub avg_current: f64,
    pub avg_power: f64,
    pub min_power: f64,
    pub max_power: f64,
    pub total_energy_kwh: f64,
    pub cost_estimate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillingRate {
    pub id: i64,
    pub rate_name: String,
    /// "on_peak" | "off_peak" | "super_off_peak"
    pub rate_type: String,
    /// "summer" | "winter" | "all"
    pub season: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub rate_per_kwh: f64,
    pub effective_date: NaiveDate,
    pub is_active: bool,
}

/// Per-circuit time-of-use buckets for one day, derived from hourly rollups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitDayCost {
    pub circuit_id: i64,
    pub on_peak_kwh: f64,
    pub off_peak_kwh: f64,
    pub super_off_peak_kwh: f64,
    pub on_peak_cost: f64,
    pub off_peak_cost: f64,
    pub super_off_peak_cost: f64,
}

impl CircuitDayCost {
    pub fn total_cost(&self) -> f64 {
        self.on_peak_cost + self.off_peak_cost + self.super_off_peak_cost
    }
}
