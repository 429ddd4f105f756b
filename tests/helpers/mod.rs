//! Stub collaborators for exercising the orchestrator and routes without
//! network access.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use reqwest::StatusCode;
use serde_json::Value;

use photo_booth::config::styles::StyleTable;
use photo_booth::models::job::JobStatus;
use photo_booth::services::inference::{
    InferenceClient, InferenceError, PredictionStatus, SwapInput,
};
use photo_booth::services::job_store::JobStore;
use photo_booth::services::mask::{FaceBox, FaceDetector, MaskError, MaskGenerator};
use photo_booth::services::orchestrator::SwapOrchestrator;
use photo_booth::services::storage::{ImageStore, StorageError, UploadedImage};

/// In-memory image store that records every call.
#[derive(Default)]
pub struct StubStore {
    uploads: AtomicUsize,
    fail_uploads_from: Option<usize>,
    fail_deletes: bool,
    deletes: Mutex<HashMap<String, usize>>,
    listed: Vec<String>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads numbered `n` and later (0-based) fail.
    pub fn failing_uploads_from(mut self, n: usize) -> Self {
        self.fail_uploads_from = Some(n);
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn with_listed(mut self, keys: Vec<String>) -> Self {
        self.listed = keys;
        self
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self, image_ref: &str) -> usize {
        self.deletes
            .lock()
            .unwrap()
            .get(image_ref)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_deletes(&self) -> usize {
        self.deletes.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ImageStore for StubStore {
    async fn upload(&self, _data: &[u8]) -> Result<UploadedImage, StorageError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads_from.is_some_and(|from| n >= from) {
            return Err(StorageError::Status {
                key: format!("ref-{n}"),
                code: 503,
            });
        }
        Ok(UploadedImage {
            url: format!("https://store.test/ref-{n}"),
            image_ref: format!("ref-{n}"),
        })
    }

    async fn delete(&self, image_ref: &str) -> Result<(), StorageError> {
        *self
            .deletes
            .lock()
            .unwrap()
            .entry(image_ref.to_string())
            .or_default() += 1;
        if self.fail_deletes {
            return Err(StorageError::Status {
                key: image_ref.to_string(),
                code: 500,
            });
        }
        Ok(())
    }

    async fn list_temp(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.listed.clone())
    }
}

/// Inference stub replaying scripted statuses. The last status repeats.
#[derive(Default)]
pub struct StubInference {
    fail_submit: bool,
    submits: AtomicUsize,
    checks: AtomicUsize,
    submitted: Mutex<Vec<SwapInput>>,
    statuses: Mutex<VecDeque<Result<PredictionStatus, u16>>>,
}

impl StubInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn then(self, status: PredictionStatus) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(status));
        self
    }

    /// Script a transport failure with the given HTTP status.
    pub fn then_error(self, code: u16) -> Self {
        self.statuses.lock().unwrap().push_back(Err(code));
        self
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<SwapInput> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for StubInference {
    async fn submit(&self, input: &SwapInput) -> Result<String, InferenceError> {
        self.submitted.lock().unwrap().push(input.clone());
        if self.fail_submit {
            return Err(InferenceError::Api {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: "invalid input".to_string(),
            });
        }
        let n = self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(format!("pred-{n}"))
    }

    async fn check(&self, _job_id: &str) -> Result<PredictionStatus, InferenceError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        // Let concurrent polls interleave around the remote call.
        tokio::task::yield_now().await;

        let next = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            }
        };
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(code)) => Err(InferenceError::Api {
                status: StatusCode::from_u16(code).unwrap(),
                body: "upstream unavailable".to_string(),
            }),
            None => Ok(processing()),
        }
    }
}

/// Detector that always reports the same faces.
pub struct FixedDetector(pub Vec<FaceBox>);

#[async_trait]
impl FaceDetector for FixedDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<FaceBox>, MaskError> {
        Ok(self.0.clone())
    }
}

pub fn mask_generator_with_face() -> MaskGenerator {
    MaskGenerator::new(Arc::new(FixedDetector(vec![FaceBox {
        left: 8,
        top: 8,
        width: 16,
        height: 16,
    }])))
}

pub fn mask_generator_without_face() -> MaskGenerator {
    MaskGenerator::new(Arc::new(FixedDetector(vec![])))
}

pub fn processing() -> PredictionStatus {
    PredictionStatus {
        status: JobStatus::Processing,
        output: None,
        error: None,
    }
}

pub fn succeeded(output: Value) -> PredictionStatus {
    PredictionStatus {
        status: JobStatus::Succeeded,
        output: Some(output),
        error: None,
    }
}

pub fn failed(error: &str) -> PredictionStatus {
    PredictionStatus {
        status: JobStatus::Failed,
        output: None,
        error: Some(error.to_string()),
    }
}

/// A small valid PNG.
pub fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 32, image::Rgb([210, 170, 150]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn styles() -> Arc<StyleTable> {
    let table = StyleTable::builtin("superman");
    table.validate().unwrap();
    Arc::new(table)
}

pub struct Harness {
    pub orchestrator: SwapOrchestrator,
    pub store: Arc<StubStore>,
    pub inference: Arc<StubInference>,
    pub jobs: Arc<JobStore>,
}

pub fn harness(store: StubStore, masks: MaskGenerator, inference: StubInference) -> Harness {
    let store = Arc::new(store);
    let inference = Arc::new(inference);
    let jobs = Arc::new(JobStore::new());
    let orchestrator = SwapOrchestrator::new(
        store.clone(),
        Arc::new(masks),
        inference.clone(),
        styles(),
        jobs.clone(),
    );
    Harness {
        orchestrator,
        store,
        inference,
        jobs,
    }
}
