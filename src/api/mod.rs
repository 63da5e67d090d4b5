pub mod controls;
pub mod health;
pub mod orders;
pub mod summaries;

use crate::orchestration::ControllerHandle;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,
}

impl AppState {
    pub fn new(controller: ControllerHandle) -> Self {
        Self { controller }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/orders", get(orders::get_orders))
        .route("/v1/fills", post(orders::post_fill))
        .route("/v1/leagues", get(summaries::get_leagues))
        .route("/v1/games", get(summaries::get_games))
        .route("/v1/counterparties", get(summaries::get_counterparties))
        .route(
            "/v1/counterparties/expanded",
            put(controls::put_counterparties_expanded),
        )
        .route(
            "/v1/filters",
            get(controls::get_filters).put(controls::put_filter),
        )
        .route("/v1/columns", get(controls::get_columns))
        .route("/v1/columns/:name/toggle", post(controls::toggle_column))
        .layer(cors)
        .with_state(state)
}
