use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::engine::{CounterpartyView, FilterKind, FilterState};
use crate::error::AppError;
use crate::orchestration::ColumnVisibility;

#[derive(Debug, Deserialize)]
pub struct FilterUpdate {
    pub kind: FilterKind,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpandedUpdate {
    pub expanded: bool,
}

pub async fn get_filters(State(state): State<AppState>) -> Json<FilterState> {
    Json(state.controller.views().filter.clone())
}

pub async fn put_filter(
    State(state): State<AppState>,
    Json(update): Json<FilterUpdate>,
) -> Result<Json<FilterState>, AppError> {
    let filter = state
        .controller
        .set_filter(update.kind, update.value)
        .await?;
    Ok(Json(filter))
}

pub async fn get_columns(State(state): State<AppState>) -> Json<ColumnVisibility> {
    Json(state.controller.views().columns.clone())
}

pub async fn toggle_column(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ColumnVisibility>, AppError> {
    let columns = state.controller.toggle_column(&name).await?;
    Ok(Json(columns))
}

pub async fn put_counterparties_expanded(
    State(state): State<AppState>,
    Json(update): Json<ExpandedUpdate>,
) -> Result<Json<CounterpartyView>, AppError> {
    let view = state
        .controller
        .set_counterparties_expanded(update.expanded)
        .await?;
    Ok(Json(view))
}
