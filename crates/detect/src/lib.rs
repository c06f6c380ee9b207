//! Sign-language gesture detection from still images.
//!
//! The detector itself is an opaque ONNX model; this crate decodes the
//! inbound image, runs the model (or an explicit degraded fallback when no
//! model is installed) and shapes raw detections into the word list the
//! detection service returns.

mod decode;
mod degraded;
mod onnx;
mod report;

pub use decode::decode_base64_image;
pub use degraded::DegradedDetector;
pub use onnx::OnnxGestureDetector;
pub use report::{build_report, DetectionReport, NO_SIGNS_SENTINEL};

use image::DynamicImage;

/// Default confidence threshold; deliberately permissive to favor recall.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("No image data provided")]
    NoImageProvided,
    #[error("Invalid image data")]
    InvalidImage,
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// One detected region, already mapped to a gesture label.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

/// A gesture detector behind a fixed contract; implementations are either
/// the real model or the degraded fallback, chosen once at startup.
pub trait GestureDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;

    /// True for the fallback path used when no model is installed.
    fn is_degraded(&self) -> bool {
        false
    }
}
