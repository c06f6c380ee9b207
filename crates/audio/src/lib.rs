mod capture;
mod device;

pub use capture::{CaptureConfig, MicCapture};
pub use device::{list_input_devices, AudioDevice};

/// Sample rate every frame leaving this crate is resampled to.
pub const SAMPLE_RATE: u32 = 16000;

/// Samples per frame handed to the recognizer (500ms at 16kHz).
pub const FRAME_SAMPLES: usize = 8000;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("stream error: {0}")]
    StreamError(String),
    #[error("device error: {0}")]
    DeviceError(#[from] cpal::DevicesError),
    #[error("build stream error: {0}")]
    BuildStreamError(#[from] cpal::BuildStreamError),
}

pub type Result<T> = std::result::Result<T, AudioError>;
