use crate::api::handlers::{circuits, costs, energy, health, system};
use crate::api::ApiState;
use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/realtime-data", get(energy::realtime_data))
        .route("/api/historical-data", get(energy::historical_data))
        .route("/api/daily-usage", get(energy::daily_usage))
        .route("/api/cost-analysis", get(costs::cost_analysis))
        .route("/api/circuits", get(circuits::list))
        .route("/api/circuits/{id}", put(circuits::update))
        .route("/api/billing-rates", get(costs::billing_rates))
        .route("/api/system-status", get(system::system_status))
        .route("/api/export-data", get(energy::export_data))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
