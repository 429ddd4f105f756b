use async_trait::async_trait;
use image::ImageFormat;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::{debug, info};

/// Prefix under which every temporary upload lives.
pub const TEMP_PREFIX: &str = "temp_faces/";

const KEY_STEM: &str = "temp_face_";

/// A temporary image reachable by the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    /// Opaque handle for [`ImageStore::delete`].
    pub image_ref: String,
}

/// Ephemeral image storage used for child photos and face masks.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload under a fresh key; repeated uploads never collide.
    async fn upload(&self, data: &[u8]) -> Result<UploadedImage, StorageError>;

    /// Delete an upload. Deleting something already gone is not an error.
    async fn delete(&self, image_ref: &str) -> Result<(), StorageError>;

    /// Refs of every temporary upload still in the store.
    async fn list_temp(&self) -> Result<Vec<String>, StorageError>;
}

/// Cloudflare R2 (S3-compatible) image store.
pub struct R2ImageStore {
    bucket: Box<Bucket>,
    public_url: String,
}

impl R2ImageStore {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_url: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    fn public_url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[async_trait]
impl ImageStore for R2ImageStore {
    async fn upload(&self, data: &[u8]) -> Result<UploadedImage, StorageError> {
        let format = image::guess_format(data).unwrap_or(ImageFormat::Png);
        let key = temp_key(chrono::Utc::now().timestamp(), format);

        debug!(key = %key, bytes = data.len(), "Uploading temporary image");
        let response = self
            .bucket
            .put_object_with_content_type(&key, data, format.to_mime_type())
            .await?;

        let code = response.status_code();
        if !(200..300).contains(&code) {
            return Err(StorageError::Status { key, code });
        }

        info!(key = %key, "Temporary image uploaded");
        Ok(UploadedImage {
            url: self.public_url_for(&key),
            image_ref: key,
        })
    }

    async fn delete(&self, image_ref: &str) -> Result<(), StorageError> {
        let response = self.bucket.delete_object(image_ref).await?;
        match response.status_code() {
            200..=299 | 404 => {
                debug!(key = %image_ref, "Temporary image deleted");
                Ok(())
            }
            code => Err(StorageError::Status {
                key: image_ref.to_string(),
                code,
            }),
        }
    }

    async fn list_temp(&self) -> Result<Vec<String>, StorageError> {
        let pages = self.bucket.list(TEMP_PREFIX.to_string(), None).await?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect())
    }
}

/// Build a key of the form `temp_faces/temp_face_{unix_ts}_{suffix}.{ext}`.
pub fn temp_key(timestamp: i64, format: ImageFormat) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let ext = format.extensions_str().first().copied().unwrap_or("png");
    format!("{TEMP_PREFIX}{KEY_STEM}{timestamp}_{}.{ext}", &suffix[..8])
}

/// Unix timestamp embedded in a key produced by [`temp_key`].
pub fn parse_upload_timestamp(key: &str) -> Option<i64> {
    let name = key.strip_prefix(TEMP_PREFIX).unwrap_or(key);
    let rest = name.strip_prefix(KEY_STEM)?;
    let (timestamp, _) = rest.split_once('_')?;
    timestamp.parse().ok()
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage returned HTTP {code} for '{key}'")]
    Status { key: String, code: u16 },

    #[error("Storage configuration error: {0}")]
    Config(String),
}
