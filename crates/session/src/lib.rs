//! The speech-to-text listening session.
//!
//! One session is live at a time: `start` opens the microphone and spawns a
//! drain worker that feeds captured frames to the recognizer, `stop` closes
//! the microphone, collects the recognizer's final flush and returns the
//! accumulated transcript, `status` snapshots state without side effects.

mod controller;
mod worker;

pub use controller::{
    CaptureOpener, CaptureStream, MicOpener, RecognizerLoader, SessionController, SessionStatus,
    StartInfo, VoskLoader, DEFAULT_LANGUAGE,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Already listening")]
    AlreadyListening,
    #[error("Not currently listening")]
    NotListening,
    #[error(transparent)]
    Model(#[from] signbridge_models::ModelError),
    #[error("audio error: {0}")]
    Audio(#[from] signbridge_audio::AudioError),
    #[error("recognizer error: {0}")]
    Stt(#[from] signbridge_stt::SttError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
