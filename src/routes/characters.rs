use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::models::swap::CharactersResponse;

/// GET /characters — style keys accepted by `/swap-face`.
pub async fn list_characters(State(state): State<AppState>) -> Json<CharactersResponse> {
    Json(CharactersResponse {
        default: state.styles.default_key().to_string(),
        characters: state.styles.keys().map(str::to_string).collect(),
    })
}
