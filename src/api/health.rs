use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the startup history has been replayed (or skipped).
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let views = state.controller.views();
    if !views.ready {
        return Err(AppError::Unavailable("history backfill pending".to_string()));
    }
    Ok(Json(serde_json::json!({
        "status": "ready",
        "entries": views.orders.len(),
    })))
}
