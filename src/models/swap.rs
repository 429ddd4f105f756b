use garde::Validate;
use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// Body of `POST /swap-face`.
///
/// Fields default to empty so a missing field fails validation (400) rather
/// than JSON extraction.
#[derive(Debug, Deserialize, Validate)]
pub struct SwapRequest {
    /// Data URL (`data:image/png;base64,...`) or bare base64.
    #[serde(default)]
    #[garde(length(min = 1))]
    pub child_photo: String,

    #[serde(default)]
    #[garde(length(min = 1, max = 100))]
    pub character: String,
}

/// Response after a face-swap job has been accepted.
#[derive(Debug, Serialize, Deserialize)]
pub struct SwapResponse {
    pub prediction_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Response for `GET /check-status/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CharactersResponse {
    pub default: String,
    pub characters: Vec<String>,
}
