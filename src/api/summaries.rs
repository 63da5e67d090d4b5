use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::engine::{CounterpartyView, GameSummary, LeagueView};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamesResponse {
    pub summary_pass: u64,
    pub games: Arc<Vec<GameSummary>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaguesResponse {
    pub summary_pass: u64,
    #[serde(flatten)]
    pub view: Arc<LeagueView>,
}

pub async fn get_leagues(State(state): State<AppState>) -> Json<LeaguesResponse> {
    let views = state.controller.views();
    Json(LeaguesResponse {
        summary_pass: views.summary_passes,
        view: views.leagues.clone(),
    })
}

pub async fn get_games(State(state): State<AppState>) -> Json<GamesResponse> {
    let views = state.controller.views();
    Json(GamesResponse {
        summary_pass: views.summary_passes,
        games: views.games.clone(),
    })
}

pub async fn get_counterparties(State(state): State<AppState>) -> Json<Arc<CounterpartyView>> {
    Json(state.controller.views().counterparties.clone())
}
