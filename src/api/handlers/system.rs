use crate::api::models::SystemStatusResponse;
use crate::api::ApiState;
use crate::error::Result;
use axum::{extract::State, response::Json};
use chrono::{Duration, Utc};

/// Device health, freshness of the newest reading and 24 h ingest volume.
pub async fn system_status(State(state): State<ApiState>) -> Result<Json<SystemStatusResponse>> {
    let now = Utc::now();

    let devices = state.dashboard.devices_status().await?;
    let last_reading = state.dashboard.last_reading_ts().await?;
    let stats = state.dashboard.ingest_stats(now - Duration::days(1)).await?;

    Ok(Json(SystemStatusResponse {
        devices,
        last_reading,
        stats,
        server_time: now,
    }))
}
