use crate::api::models::{ExportQuery, HistoryQuery, RealtimeResponse, RealtimeSummary};
use crate::api::ApiState;
use crate::error::{AppError, Result};
use crate::repositories::dashboard::{DailyUsageRow, HourlyPoint};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};

const MAX_HISTORY_HOURS: i64 = 720;

/// Current state of every active circuit plus panel-level summary totals.
pub async fn realtime_data(State(state): State<ApiState>) -> Result<Json<RealtimeResponse>> {
    let circuits = state.dashboard.realtime_circuits().await?;

    let total_power: f64 = circuits.iter().filter_map(|c| c.power_watts).sum();

    let voltages: Vec<f64> = circuits.iter().filter_map(|c| c.voltage).collect();
    let avg_voltage = if voltages.is_empty() {
        0.0
    } else {
        voltages.iter().sum::<f64>() / voltages.len() as f64
    };

    let frequencies: Vec<f64> = circuits.iter().filter_map(|c| c.frequency).collect();
    let avg_frequency = if frequencies.is_empty() {
        60.0
    } else {
        frequencies.iter().sum::<f64>() / frequencies.len() as f64
    };

    let now = Utc::now();
    let today = now.date_naive();
    let day_start = today.and_time(NaiveTime::MIN).and_utc();
    let today_energy = state.dashboard.energy_since(day_start).await?;
    let today_cost = state.dashboard.cost_for_day(today).await?;

    Ok(Json(RealtimeResponse {
        circuits,
        summary: RealtimeSummary {
            total_power,
            avg_voltage,
            avg_frequency,
            today_energy,
            today_cost,
            last_update: now,
        },
    }))
}

/// Hourly series for the chart lookback window (default 24 h, capped).
pub async fn historical_data(
    State(state): State<ApiState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HourlyPoint>>> {
    let hours = params.hours.unwrap_or(24);
    if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
        return Err(AppError::Validation(format!(
            "hours must be between 1 and {}",
            MAX_HISTORY_HOURS
        )));
    }

    let since = Utc::now() - Duration::hours(hours);
    let rows = state.dashboard.hourly_history(since).await?;
    Ok(Json(rows))
}

/// Daily usage for the trailing 30 days.
pub async fn daily_usage(State(state): State<ApiState>) -> Result<Json<Vec<DailyUsageRow>>> {
    let since = Utc::now().date_naive() - Duration::days(30);
    let rows = state.dashboard.daily_usage(since).await?;
    Ok(Json(rows))
}

/// Bounded ad-hoc export. Daily and hourly exports return every row in the
/// date range; raw exports are capped at 10 000 rows.
pub async fn export_data(
    State(state): State<ApiState>,
    Query(params): Query<ExportQuery>,
) -> Result<Json<serde_json::Value>> {
    let start = parse_date(params.start_date.as_deref(), "start_date")?;
    let end = parse_date(params.end_date.as_deref(), "end_date")?;
    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }

    let export_type = params.export_type.as_deref().unwrap_or("daily");
    let body = match export_type {
        "daily" => serde_json::to_value(state.dashboard.export_daily(start, end).await?)?,
        "hourly" => serde_json::to_value(state.dashboard.export_hourly(start, end).await?)?,
        "raw" => serde_json::to_value(state.dashboard.export_raw(start, end).await?)?,
        other => {
            return Err(AppError::Validation(format!(
                "unknown export type '{}'; expected daily, hourly or raw",
                other
            )))
        }
    };

    Ok(Json(body))
}

fn parse_date(value: Option<&str>, name: &str) -> Result<NaiveDate> {
    let raw = value.ok_or_else(|| {
        AppError::Validation("start_date and end_date are required".to_string())
    })?;
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid {}: {}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_date(Some("2024-07-15"), "start_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
        );
        assert!(parse_date(Some("07/15/2024"), "start_date").is_err());
        assert!(parse_date(None, "start_date").is_err());
    }
}
