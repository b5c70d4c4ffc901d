use crate::api::models::UpdateCircuitRequest;
use crate::api::ApiState;
use crate::error::{AppError, Result};
use crate::models::Circuit;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::json;

pub async fn list(State(state): State<ApiState>) -> Result<Json<Vec<Circuit>>> {
    let circuits = state.dashboard.circuits().await?;
    Ok(Json(circuits))
}

/// Update user-editable circuit metadata. The collector never touches these
/// fields again once set here.
pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCircuitRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.circuit_name.trim().is_empty() {
        return Err(AppError::Validation("circuit_name must not be empty".to_string()));
    }
    if req.max_amperage <= 0 {
        return Err(AppError::Validation("max_amperage must be positive".to_string()));
    }

    let updated = state
        .dashboard
        .update_circuit(
            id,
            &req.circuit_name,
            req.circuit_description.as_deref(),
            req.max_amperage,
            req.is_active,
        )
        .await?;

    if !updated {
        return Err(AppError::NotFound(format!("circuit {} not found", id)));
    }

    Ok(Json(json!({ "success": true })))
}
