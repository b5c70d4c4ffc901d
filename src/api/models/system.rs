use crate::repositories::dashboard::{DeviceStatusRow, IngestStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCircuitRequest {
    pub circuit_name: String,
    pub circuit_description: Option<String>,
    pub max_amperage: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatusResponse {
    pub devices: Vec<DeviceStatusRow>,
    pub last_reading: Option<DateTime<Utc>>,
    pub stats: IngestStats,
    pub server_time: DateTime<Utc>,
}
