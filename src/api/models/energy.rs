use crate::repositories::dashboard::{
    CircuitSnapshot, CostBucketTotals, MonthlyCostRow, TopCircuitRow,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeSummary {
    pub total_power: f64,
    pub avg_voltage: f64,
    pub avg_frequency: f64,
    pub today_energy: f64,
    pub today_cost: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeResponse {
    pub circuits: Vec<CircuitSnapshot>,
    pub summary: RealtimeSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostAnalysisResponse {
    pub today: CostBucketTotals,
    pub monthly: Vec<MonthlyCostRow>,
    pub top_circuits: Vec<TopCircuitRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub export_type: Option<String>,
}
