use serde::Deserialize;

pub mod styles;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// R2 bucket holding temporary face uploads
    pub r2_bucket: String,

    /// R2 endpoint URL (S3-compatible API)
    pub r2_endpoint: String,

    /// R2 access key ID
    pub r2_access_key: String,

    /// R2 secret access key
    pub r2_secret_key: String,

    /// Public base URL the bucket is served from. Inference workers fetch uploads here.
    pub r2_public_url: String,

    /// Replicate API token
    pub replicate_api_token: String,

    #[serde(default = "default_replicate_api_url")]
    pub replicate_api_url: String,

    /// Model in `owner/name` form. The latest version is resolved at first submission.
    #[serde(default = "default_replicate_model")]
    pub replicate_model: String,

    /// Send prompt, negative prompt and mask inputs along with the two images.
    /// Inpainting models take them, plain face-swap models do not.
    #[serde(default)]
    pub replicate_style_inputs: bool,

    /// Face swap weight (1.0 = complete swap, 0.5 = blend)
    #[serde(default = "default_swap_weight")]
    pub swap_weight: f32,

    /// Azure Face API endpoint. Mask generation is disabled without it.
    pub face_api_endpoint: Option<String>,

    pub face_api_key: Option<String>,

    /// Style used when a request names an unknown character
    #[serde(default = "default_character")]
    pub default_character: String,

    /// JSON file replacing the built-in character table
    pub styles_file: Option<String>,

    #[serde(default = "default_sweep_max_age_hours")]
    pub sweep_max_age_hours: i64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_replicate_api_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_replicate_model() -> String {
    "yan-ops/face_swap".to_string()
}

fn default_swap_weight() -> f32 {
    1.0
}

fn default_character() -> String {
    "superman".to_string()
}

fn default_sweep_max_age_hours() -> i64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.swap_weight) {
            return Err(ConfigError::Invalid(format!(
                "SWAP_WEIGHT must be within 0.0..=1.0, got {}",
                self.swap_weight
            )));
        }
        if self.sweep_max_age_hours <= 0 {
            return Err(ConfigError::Invalid(
                "SWEEP_MAX_AGE_HOURS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Both the endpoint and key are required to call the face detector.
    pub fn face_api(&self) -> Option<(&str, &str)> {
        match (&self.face_api_endpoint, &self.face_api_key) {
            (Some(endpoint), Some(key)) if !endpoint.is_empty() && !key.is_empty() => {
                Some((endpoint.as_str(), key.as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vars() -> Vec<(String, String)> {
        [
            ("R2_BUCKET", "faces"),
            ("R2_ENDPOINT", "https://account.r2.cloudflarestorage.com"),
            ("R2_ACCESS_KEY", "key"),
            ("R2_SECRET_KEY", "secret"),
            ("R2_PUBLIC_URL", "https://pub.example.dev"),
            ("REPLICATE_API_TOKEN", "r8_token"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config: AppConfig = envy::from_iter(sample_vars()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.replicate_model, "yan-ops/face_swap");
        assert_eq!(config.default_character, "superman");
        assert_eq!(config.swap_weight, 1.0);
        assert!(!config.replicate_style_inputs);
        assert!(config.face_api().is_none());
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_face_api_requires_both_values() {
        let mut vars = sample_vars();
        vars.push(("FACE_API_ENDPOINT".into(), "https://face.example.com".into()));
        let config: AppConfig = envy::from_iter(vars.clone()).unwrap();
        assert!(config.face_api().is_none());

        vars.push(("FACE_API_KEY".into(), "abc".into()));
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert_eq!(config.face_api(), Some(("https://face.example.com", "abc")));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let mut vars = sample_vars();
        vars.push(("SWAP_WEIGHT".into(), "1.5".into()));
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_required_var() {
        let vars: Vec<(String, String)> = sample_vars()
            .into_iter()
            .filter(|(k, _)| k != "R2_BUCKET")
            .collect();
        assert!(envy::from_iter::<_, AppConfig>(vars).is_err());
    }
}
