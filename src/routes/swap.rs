use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::job::{JobOutcome, JobStatus};
use crate::models::swap::{StatusResponse, SwapRequest, SwapResponse};
use crate::routes::error::{ApiError, ApiResult};

/// POST /swap-face — start blending a child's photo into a character.
pub async fn swap_face(
    State(state): State<AppState>,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SwapResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request.validate().map_err(|report| {
        if request.child_photo.is_empty() || request.character.is_empty() {
            ApiError::bad_request("Missing required fields: child_photo and character")
        } else {
            ApiError::bad_request(format!("Invalid request: {report}"))
        }
    })?;

    let photo = decode_photo(&request.child_photo)?;

    // Reject anything that is not a recognizable image before uploading it.
    image::guess_format(&photo)
        .map_err(|_| ApiError::UnsupportedMediaType("child_photo is not a supported image".into()))?;

    tracing::info!(
        character = %request.character,
        bytes = photo.len(),
        "Face swap request received"
    );

    let prediction_id = state
        .orchestrator
        .submit(&photo, &request.character)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SwapResponse {
            prediction_id,
            status: JobStatus::Processing,
            message: "Face blending started. Poll /check-status to get updates.".to_string(),
        }),
    ))
}

/// GET /check-status/{prediction_id} — one status query for a tracked job.
pub async fn check_status(
    State(state): State<AppState>,
    Path(prediction_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let response = match state.orchestrator.poll(&prediction_id).await? {
        JobOutcome::Pending { status } => StatusResponse {
            status,
            result_url: None,
            error: None,
        },
        JobOutcome::Succeeded { result_url } => StatusResponse {
            status: JobStatus::Succeeded,
            result_url: Some(result_url),
            error: None,
        },
        JobOutcome::Failed { error } => StatusResponse {
            status: JobStatus::Failed,
            result_url: None,
            error: Some(error),
        },
    };
    Ok(Json(response))
}

/// Decode a `data:image/...;base64,` URL or bare base64 string.
fn decode_photo(child_photo: &str) -> ApiResult<Vec<u8>> {
    let encoded = match child_photo.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| ApiError::bad_request("child_photo data URL has no payload"))?,
        None => child_photo,
    };

    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::bad_request("child_photo is not valid base64"))
}
