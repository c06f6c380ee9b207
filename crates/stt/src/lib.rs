mod recognizer;

pub use recognizer::{RecognitionResult, StreamingRecognizer, VoskRecognizer};

/// Sample rate the recognizer expects audio frames at.
pub const STT_SAMPLE_RATE: u32 = 16000;

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("recognition failed: {0}")]
    RecognitionFailed(String),
}

pub type Result<T> = std::result::Result<T, SttError>;
