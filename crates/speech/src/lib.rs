//! Text-to-speech with optional translation.
//!
//! Synthesis, playback and translation are external capabilities behind
//! trait seams; the adapter sequences them and guarantees that temporary
//! audio artifacts never outlive a request.

mod adapter;
mod playback;
mod synth;
mod translate;

pub use adapter::{SpeakOutcome, SpeechSynthesisAdapter};
pub use playback::{AudioPlayer, RodioPlayer};
pub use synth::{PiperSynthesizer, SynthesizedAudio, Synthesizer};
pub use translate::{HttpTranslator, Translator};

/// Language the inbound text is assumed to be written in.
pub const SOURCE_LANGUAGE: &str = "en";

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("No text provided")]
    NoTextProvided,
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("translation failed: {0}")]
    Translation(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

pub type Result<T> = std::result::Result<T, SpeechError>;
