//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::orchestrator::SwapError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error(transparent)]
    Swap(#[from] SwapError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Swap(err) => match err {
                SwapError::NotFound(_) => StatusCode::NOT_FOUND,
                SwapError::ResultMissing(_) | SwapError::StatusCheck { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                SwapError::Upload(_) | SwapError::Submission(_) | SwapError::NoStyle(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Swap(SwapError::NotFound(_)) => Some("not_found"),
            ApiError::Swap(SwapError::ResultMissing(_)) => Some("result_missing"),
            ApiError::Swap(SwapError::StatusCheck { .. }) => Some("status_check_failed"),
            ApiError::Swap(SwapError::Upload(_)) => Some("upload_failed"),
            ApiError::Swap(SwapError::Submission(_)) => Some("submission_failed"),
            _ => None,
        }
    }

    /// Client-facing message. Upstream details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Swap(SwapError::Upload(_)) => {
                "Failed to upload image to cloud storage".to_string()
            }
            ApiError::Swap(SwapError::Submission(_)) => "Failed to start AI processing".to_string(),
            ApiError::Swap(SwapError::StatusCheck { .. }) => {
                "Failed to check prediction status".to_string()
            }
            ApiError::Swap(SwapError::ResultMissing(_)) => {
                "Failed to generate result - no output URL received from AI model".to_string()
            }
            ApiError::Swap(SwapError::NotFound(_)) => "Prediction not found".to_string(),
            ApiError::Swap(SwapError::NoStyle(_)) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
