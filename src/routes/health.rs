use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    pub inference: String,
    pub face_detection: String,
    pub active_jobs: usize,
}

fn configured(flag: bool) -> String {
    let label = if flag { "configured" } else { "not configured" };
    label.to_string()
}

/// GET /health — liveness probe with configuration presence.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let integrations = state.integrations;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: configured(integrations.storage),
        inference: configured(integrations.inference),
        face_detection: configured(integrations.face_detection),
        active_jobs: state.orchestrator.active_jobs(),
    })
}
