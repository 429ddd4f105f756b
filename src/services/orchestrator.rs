//! The face-swap job lifecycle.
//!
//! `submit` uploads the photo (and a mask when one can be made), starts a
//! prediction and starts tracking it. `poll` performs one status query; the
//! first poll that sees a terminal status removes the job and deletes its
//! uploads.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::styles::StyleTable;
use crate::models::job::{JobOutcome, JobRecord, JobStatus};
use crate::services::inference::{extract_result_url, InferenceClient, InferenceError, SwapInput};
use crate::services::job_store::JobStore;
use crate::services::mask::MaskGenerator;
use crate::services::storage::{ImageStore, StorageError};

pub struct SwapOrchestrator {
    storage: Arc<dyn ImageStore>,
    masks: Arc<MaskGenerator>,
    inference: Arc<dyn InferenceClient>,
    styles: Arc<StyleTable>,
    jobs: Arc<JobStore>,
    weight: f32,
}

impl SwapOrchestrator {
    pub fn new(
        storage: Arc<dyn ImageStore>,
        masks: Arc<MaskGenerator>,
        inference: Arc<dyn InferenceClient>,
        styles: Arc<StyleTable>,
        jobs: Arc<JobStore>,
    ) -> Self {
        Self {
            storage,
            masks,
            inference,
            styles,
            jobs,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Start a face swap of `photo` into `character`, returning the job id.
    pub async fn submit(&self, photo: &[u8], character: &str) -> Result<String, SwapError> {
        let photo_upload = self.storage.upload(photo).await.map_err(SwapError::Upload)?;
        info!(image_ref = %photo_upload.image_ref, "Child photo uploaded");

        let mask_upload = match self.masks.generate(photo).await {
            Some(mask) => match self.storage.upload(&mask).await {
                Ok(upload) => {
                    info!(image_ref = %upload.image_ref, "Face mask uploaded");
                    Some(upload)
                }
                Err(e) => {
                    warn!(error = %e, "Mask upload failed, proceeding without mask");
                    None
                }
            },
            None => {
                info!("No face mask available, proceeding without mask");
                None
            }
        };

        let Some(resolved) = self.styles.resolve(character) else {
            // Only reachable with an unvalidated style table.
            self.cleanup(
                &photo_upload.image_ref,
                mask_upload.as_ref().map(|m| m.image_ref.as_str()),
            )
            .await;
            return Err(SwapError::NoStyle(character.to_string()));
        };
        if resolved.fallback {
            warn!(
                character = %character,
                fallback = %resolved.key,
                "Unknown character, using default style"
            );
        }

        let input = SwapInput {
            source_image: photo_upload.url.clone(),
            target_image: resolved.style.template_url.clone(),
            mask_image: mask_upload.as_ref().map(|m| m.url.clone()),
            weight: self.weight,
            prompt: resolved.style.prompt.clone(),
            negative_prompt: resolved.style.negative_prompt.clone(),
        };

        let job_id = match self.inference.submit(&input).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, character = %resolved.key, "Prediction submission failed");
                self.cleanup(
                    &photo_upload.image_ref,
                    mask_upload.as_ref().map(|m| m.image_ref.as_str()),
                )
                .await;
                return Err(SwapError::Submission(e));
            }
        };

        self.jobs.insert(JobRecord {
            job_id: job_id.clone(),
            source_image_ref: photo_upload.image_ref,
            mask_image_ref: mask_upload.map(|m| m.image_ref),
            character: resolved.key.to_string(),
            status: JobStatus::Processing,
            created_at: Utc::now(),
        });
        metrics::counter!("swap_jobs_submitted_total").increment(1);
        metrics::gauge!("swap_active_jobs").set(self.jobs.len() as f64);

        info!(job_id = %job_id, character = %resolved.key, "Face swap job started");
        Ok(job_id)
    }

    /// Query a job once and settle it if it has finished.
    pub async fn poll(&self, job_id: &str) -> Result<JobOutcome, SwapError> {
        if !self.jobs.contains(job_id) {
            return Err(SwapError::NotFound(job_id.to_string()));
        }

        let prediction = self
            .inference
            .check(job_id)
            .await
            .map_err(|source| SwapError::StatusCheck {
                job_id: job_id.to_string(),
                source,
            })?;

        if !prediction.status.is_terminal() {
            self.jobs.update_status(job_id, prediction.status);
            return Ok(JobOutcome::Pending {
                status: prediction.status,
            });
        }

        // A concurrent poll may have settled the job while we were waiting.
        let Some(record) = self.jobs.take(job_id) else {
            return Err(SwapError::NotFound(job_id.to_string()));
        };
        metrics::gauge!("swap_active_jobs").set(self.jobs.len() as f64);
        let age_secs = record.age(Utc::now()).num_seconds();

        self.cleanup(&record.source_image_ref, record.mask_image_ref.as_deref())
            .await;

        if prediction.status == JobStatus::Succeeded {
            return match prediction.output.as_ref().and_then(extract_result_url) {
                Some(result_url) => {
                    metrics::counter!("swap_jobs_succeeded_total").increment(1);
                    info!(
                        job_id = %job_id,
                        character = %record.character,
                        age_secs,
                        result_url = %result_url,
                        "Face swap succeeded"
                    );
                    Ok(JobOutcome::Succeeded { result_url })
                }
                None => {
                    metrics::counter!("swap_jobs_result_missing_total").increment(1);
                    warn!(
                        job_id = %job_id,
                        output = ?prediction.output,
                        "Prediction succeeded without a usable result URL"
                    );
                    Err(SwapError::ResultMissing(job_id.to_string()))
                }
            };
        }

        let error = prediction
            .error
            .unwrap_or_else(|| format!("Prediction {}", prediction.status));
        metrics::counter!("swap_jobs_failed_total").increment(1);
        warn!(
            job_id = %job_id,
            character = %record.character,
            age_secs,
            error = %error,
            "Face swap failed"
        );
        Ok(JobOutcome::Failed { error })
    }

    /// Best-effort deletion of a job's uploads.
    async fn cleanup(&self, source_ref: &str, mask_ref: Option<&str>) {
        for image_ref in std::iter::once(source_ref).chain(mask_ref) {
            if let Err(e) = self.storage.delete(image_ref).await {
                metrics::counter!("swap_cleanup_failures_total").increment(1);
                warn!(image_ref = %image_ref, error = %e, "Failed to delete temporary image");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    #[error("Failed to upload image to cloud storage: {0}")]
    Upload(#[source] StorageError),

    #[error("Failed to start AI processing: {0}")]
    Submission(#[source] InferenceError),

    #[error("No style available for character '{0}'")]
    NoStyle(String),

    #[error("Prediction not found: {0}")]
    NotFound(String),

    #[error("Failed to check status of prediction {job_id}: {source}")]
    StatusCheck {
        job_id: String,
        #[source]
        source: InferenceError,
    },

    #[error("Prediction {0} succeeded but returned no output URL")]
    ResultMissing(String),
}
