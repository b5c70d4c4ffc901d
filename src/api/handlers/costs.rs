use crate::api::models::CostAnalysisResponse;
use crate::api::ApiState;
use crate::error::Result;
use crate::models::BillingRate;
use axum::{extract::State, response::Json};
use chrono::{Months, Utc};

const TOP_CIRCUIT_LIMIT: i64 = 10;

/// Today's time-of-use breakdown, trailing twelve monthly totals and the
/// most expensive circuits of the day.
pub async fn cost_analysis(State(state): State<ApiState>) -> Result<Json<CostAnalysisResponse>> {
    let today = Utc::now().date_naive();
    let year_ago = today - Months::new(12);

    let today_totals = state.dashboard.cost_day_totals(today).await?;
    let monthly = state.dashboard.monthly_costs(year_ago).await?;
    let top_circuits = state.dashboard.top_circuits(today, TOP_CIRCUIT_LIMIT).await?;

    Ok(Json(CostAnalysisResponse {
        today: today_totals,
        monthly,
        top_circuits,
    }))
}

pub async fn billing_rates(State(state): State<ApiState>) -> Result<Json<Vec<BillingRate>>> {
    let rates = state.rates.active_rates().await?;
    Ok(Json(rates))
}
