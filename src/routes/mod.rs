use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod characters;
pub mod error;
pub mod health;
pub mod metrics;
pub mod swap;

/// Booth UI and API routes with state applied.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../../static/index.html")) }))
        .route("/health", get(health::health_check))
        .route("/characters", get(characters::list_characters))
        .route("/swap-face", post(swap::swap_face))
        .route("/check-status/{prediction_id}", get(swap::check_status))
        .with_state(state)
}
