use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::models::job::JobStatus;

/// Keys checked, in order, when a prediction's output is an object.
const RESULT_URL_KEYS: [&str; 5] = ["cache_url", "url", "output_url", "image", "result"];

/// Everything needed to start one face-swap prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapInput {
    /// The child's photo (face to swap from).
    pub source_image: String,
    /// The character template (image to swap into).
    pub target_image: String,
    pub mask_image: Option<String>,
    pub weight: f32,
    pub prompt: String,
    pub negative_prompt: String,
}

/// Snapshot of a remote prediction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionStatus {
    pub status: JobStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default, deserialize_with = "error_message")]
    pub error: Option<String>,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Start a prediction and return its id.
    async fn submit(&self, input: &SwapInput) -> Result<String, InferenceError>;

    /// One status query; no retries.
    async fn check(&self, job_id: &str) -> Result<PredictionStatus, InferenceError>;
}

/// Client for the Replicate predictions API.
pub struct ReplicateClient {
    http: Client,
    api_url: String,
    api_token: String,
    model: String,
    style_inputs: bool,
    version: OnceCell<String>,
}

#[derive(Deserialize)]
struct ModelResponse {
    latest_version: Option<ModelVersion>,
}

#[derive(Deserialize)]
struct ModelVersion {
    id: String,
}

#[derive(Deserialize)]
struct CreatedPrediction {
    id: String,
    status: JobStatus,
}

impl ReplicateClient {
    pub fn new(api_url: &str, api_token: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            model: model.to_string(),
            style_inputs: false,
            version: OnceCell::new(),
        }
    }

    /// Also send prompt, negative prompt and mask URL with each prediction.
    pub fn with_style_inputs(mut self, enabled: bool) -> Self {
        self.style_inputs = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Latest version of the configured model, fetched once.
    async fn model_version(&self) -> Result<&str, InferenceError> {
        let version = self
            .version
            .get_or_try_init(|| async {
                let url = format!("{}/models/{}", self.api_url, self.model);
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(&self.api_token)
                    .send()
                    .await?;
                let response = ensure_success(response).await?;
                let model: ModelResponse = response.json().await?;
                let version = model
                    .latest_version
                    .map(|v| v.id)
                    .ok_or_else(|| InferenceError::NoVersion(self.model.clone()))?;
                info!(model = %self.model, version = %version, "Resolved model version");
                Ok::<_, InferenceError>(version)
            })
            .await?;
        Ok(version.as_str())
    }

    fn build_input(&self, input: &SwapInput) -> Value {
        let mut fields = Map::new();
        fields.insert("source_image".into(), json!(input.source_image));
        fields.insert("target_image".into(), json!(input.target_image));
        fields.insert("weight".into(), json!(input.weight));
        if self.style_inputs {
            fields.insert("prompt".into(), json!(input.prompt));
            fields.insert("negative_prompt".into(), json!(input.negative_prompt));
            if let Some(mask) = &input.mask_image {
                fields.insert("mask_image".into(), json!(mask));
            }
        }
        Value::Object(fields)
    }
}

#[async_trait]
impl InferenceClient for ReplicateClient {
    async fn submit(&self, input: &SwapInput) -> Result<String, InferenceError> {
        let version = self.model_version().await?;
        let body = json!({
            "version": version,
            "input": self.build_input(input),
        });

        let response = self
            .http
            .post(format!("{}/predictions", self.api_url))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let created: CreatedPrediction = response.json().await?;

        info!(
            prediction_id = %created.id,
            status = %created.status,
            model = %self.model,
            "Prediction created"
        );
        Ok(created.id)
    }

    async fn check(&self, job_id: &str) -> Result<PredictionStatus, InferenceError> {
        let response = self
            .http
            .get(format!("{}/predictions/{}", self.api_url, job_id))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let status: PredictionStatus = response.json().await?;
        debug!(prediction_id = %job_id, status = %status.status, "Prediction status");
        Ok(status)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InferenceError::Api { status, body })
}

/// Prediction errors arrive as a string, null, or occasionally an object.
fn error_message<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Pull the result URL out of a prediction's output.
///
/// Models disagree on shape: a bare string, a list of URLs, or an object
/// such as `{"cache_url": "...", "msg": "succeed"}`.
pub fn extract_result_url(output: &Value) -> Option<String> {
    let url = match output {
        Value::String(url) => Some(url.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        Value::Object(fields) => RESULT_URL_KEYS
            .iter()
            .filter_map(|key| fields.get(*key).and_then(Value::as_str))
            .find(|url| !url.is_empty()),
        _ => None,
    };
    url.filter(|url| !url.is_empty()).map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Model '{0}' has no published version")]
    NoVersion(String),
}
