//! Soft-edged face masks.
//!
//! A mask is a grayscale image the size of the photo: white over an oval
//! covering the detected face, black elsewhere, blurred so the blend has no
//! hard seam.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Luma};
use imageproc::drawing::draw_filled_ellipse_mut;
use imageproc::filter::gaussian_blur_f32;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Oval width relative to the face box.
const OVAL_WIDTH_RATIO: f32 = 0.6;
/// Oval height relative to the face box.
const OVAL_HEIGHT_RATIO: f32 = 0.7;
/// Matches a 51x51 Gaussian kernel.
const BLUR_SIGMA: f32 = 8.0;
/// Largest mask edge, in pixels, rendered in memory.
pub const MAX_MASK_DIMENSION: u32 = 4096;

/// Axis-aligned face bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Faces found in the image, most prominent first.
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceBox>, MaskError>;
}

/// Azure Face API detector.
pub struct AzureFaceDetector {
    http: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureFace {
    face_rectangle: AzureFaceRectangle,
}

#[derive(Deserialize)]
struct AzureFaceRectangle {
    top: f32,
    left: f32,
    width: f32,
    height: f32,
}

impl AzureFaceDetector {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl FaceDetector for AzureFaceDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceBox>, MaskError> {
        let url = format!(
            "{}/face/v1.0/detect?returnFaceId=false&returnFaceLandmarks=false",
            self.endpoint
        );

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?
            .error_for_status()?;

        let faces: Vec<AzureFace> = response.json().await?;
        Ok(faces
            .into_iter()
            .map(|face| FaceBox {
                left: face.face_rectangle.left.max(0.0) as u32,
                top: face.face_rectangle.top.max(0.0) as u32,
                width: face.face_rectangle.width.max(0.0) as u32,
                height: face.face_rectangle.height.max(0.0) as u32,
            })
            .collect())
    }
}

/// Produces face masks, or nothing when a mask cannot be made.
pub struct MaskGenerator {
    detector: Option<Arc<dyn FaceDetector>>,
}

impl MaskGenerator {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// A generator that never produces a mask.
    pub fn disabled() -> Self {
        Self { detector: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.detector.is_some()
    }

    /// PNG mask for the first face in `image`, or `None` when there is no
    /// face or anything along the way fails. Never errors.
    pub async fn generate(&self, image: &[u8]) -> Option<Vec<u8>> {
        let detector = self.detector.as_ref()?;

        if image.is_empty() {
            warn!("Mask skipped: empty image");
            return None;
        }

        let (width, height) = match image_dimensions(image) {
            Ok(dims) => dims,
            Err(e) => {
                warn!(error = %e, "Mask skipped: image could not be decoded");
                return None;
            }
        };

        let faces = match detector.detect(image).await {
            Ok(faces) => faces,
            Err(e) => {
                warn!(error = %e, "Mask skipped: face detection failed");
                return None;
            }
        };

        let Some(face) = faces.into_iter().next() else {
            info!("Mask skipped: no face detected");
            return None;
        };
        debug!(?face, width, height, "Face detected, rendering mask");

        match tokio::task::spawn_blocking(move || render_mask(width, height, face)).await {
            Ok(Ok(mask)) => Some(mask),
            Ok(Err(e)) => {
                warn!(error = %e, "Mask rendering failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "Mask rendering task panicked");
                None
            }
        }
    }
}

fn image_dimensions(image: &[u8]) -> Result<(u32, u32), MaskError> {
    let (width, height) = ImageReader::new(Cursor::new(image))
        .with_guessed_format()?
        .into_dimensions()?;
    check_canvas(width, height)?;
    Ok((width, height))
}

fn check_canvas(width: u32, height: u32) -> Result<(), MaskError> {
    if width == 0 || height == 0 {
        return Err(MaskError::EmptyCanvas);
    }
    if width > MAX_MASK_DIMENSION || height > MAX_MASK_DIMENSION {
        return Err(MaskError::TooLarge { width, height });
    }
    Ok(())
}

/// Draw a blurred oval over `face` on a black canvas and encode it as PNG.
pub fn render_mask(width: u32, height: u32, face: FaceBox) -> Result<Vec<u8>, MaskError> {
    check_canvas(width, height)?;

    let mut mask = GrayImage::new(width, height);
    let center = (
        (face.left + face.width / 2) as i32,
        (face.top + face.height / 2) as i32,
    );
    let radius_x = ((face.width as f32 * OVAL_WIDTH_RATIO) / 2.0) as i32;
    let radius_y = ((face.height as f32 * OVAL_HEIGHT_RATIO) / 2.0) as i32;
    draw_filled_ellipse_mut(&mut mask, center, radius_x, radius_y, Luma([255u8]));

    let mask = gaussian_blur_f32(&mask, BLUR_SIGMA);

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(mask).write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("Face detection request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot render a mask on an empty canvas")]
    EmptyCanvas,

    #[error("Image is {width}x{height}, larger than {max} pixels on a side", max = MAX_MASK_DIMENSION)]
    TooLarge { width: u32, height: u32 },
}
