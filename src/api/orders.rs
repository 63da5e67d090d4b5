use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use crate::domain::FillRecord;
use crate::engine::FilterState;
use crate::error::AppError;
use crate::ledger::UpsertOutcome;
use crate::orchestration::{ColumnVisibility, OrderRow};

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    /// Include rows hidden by the current filters.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersResponse {
    pub revision: u64,
    pub filter: FilterState,
    pub columns: ColumnVisibility,
    pub total: usize,
    pub orders: Vec<OrderRow>,
}

pub async fn get_orders(
    Query(params): Query<OrdersQuery>,
    State(state): State<AppState>,
) -> Json<OrdersResponse> {
    let views = state.controller.views();
    let orders: Vec<OrderRow> = if params.all {
        views.orders.clone()
    } else {
        views.visible_orders().cloned().collect()
    };

    Json(OrdersResponse {
        revision: views.revision,
        filter: views.filter.clone(),
        columns: views.columns.clone(),
        total: views.orders.len(),
        orders,
    })
}

/// Live fill push. Unknown fields are kept; malformed fields fall back to
/// neutral values, but the body itself must be a JSON object.
pub async fn post_fill(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<UpsertOutcome>, AppError> {
    if !body.is_object() {
        return Err(AppError::BadRequest("fill must be a JSON object".to_string()));
    }
    let record: FillRecord = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("invalid fill: {}", e)))?;

    let outcome = state.controller.ingest(record).await?;
    Ok(Json(outcome))
}
