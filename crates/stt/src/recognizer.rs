use std::path::Path;

use vosk::{DecodingState, Model, Recognizer};

use crate::STT_SAMPLE_RATE;

/// One recognizer output. Partial results are advisory and may be revised
/// by later audio; final results are settled at an utterance boundary and
/// never change.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RecognitionResult {
    pub is_final: bool,
    pub text: String,
}

/// Incremental speech recognition over a stream of fixed-size PCM frames.
///
/// Implementations keep decoder state between frames; `finalize` flushes
/// whatever audio is still buffered into one last final text and resets
/// the decoder for the next utterance.
pub trait StreamingRecognizer: Send {
    /// Feed one 16kHz mono i16 frame.
    ///
    /// Returns `Some` with `is_final: true` when the frame completed an
    /// utterance, `Some` with the updated partial text when it changed,
    /// and `None` when nothing new was decoded.
    fn accept_frame(&mut self, samples: &[i16]) -> crate::Result<Option<RecognitionResult>>;

    /// Flush buffered-but-unfinalized audio into a final text and reset.
    fn finalize(&mut self) -> crate::Result<String>;

    /// The current partial hypothesis, without consuming audio.
    fn partial(&self) -> &str;
}

/// Offline Kaldi recognizer backed by a local vosk model directory.
pub struct VoskRecognizer {
    recognizer: Recognizer,
    partial: String,
}

impl VoskRecognizer {
    pub fn load(model_dir: impl AsRef<Path>) -> crate::Result<Self> {
        let path = model_dir.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| crate::SttError::ModelLoad(format!("non-utf8 path: {path:?}")))?;

        let model = Model::new(path_str)
            .ok_or_else(|| crate::SttError::ModelLoad(format!("cannot open model at {path_str}")))?;

        let mut recognizer = Recognizer::new(&model, STT_SAMPLE_RATE as f32).ok_or_else(|| {
            crate::SttError::ModelLoad("failed to create recognizer".to_string())
        })?;
        recognizer.set_max_alternatives(0);
        recognizer.set_words(false);

        tracing::info!(model = path_str, "vosk model loaded");

        Ok(Self {
            recognizer,
            partial: String::new(),
        })
    }
}

impl StreamingRecognizer for VoskRecognizer {
    fn accept_frame(&mut self, samples: &[i16]) -> crate::Result<Option<RecognitionResult>> {
        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| crate::SttError::RecognitionFailed(e.to_string()))?;

        match state {
            DecodingState::Finalized => {
                let text = self
                    .recognizer
                    .result()
                    .single()
                    .map(|r| r.text.to_string())
                    .unwrap_or_default();
                self.partial.clear();
                Ok(Some(RecognitionResult {
                    is_final: true,
                    text,
                }))
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial;
                if partial == self.partial {
                    return Ok(None);
                }
                self.partial = partial.to_string();
                Ok(Some(RecognitionResult {
                    is_final: false,
                    text: self.partial.clone(),
                }))
            }
            DecodingState::Failed => Err(crate::SttError::RecognitionFailed(
                "decoder rejected waveform".to_string(),
            )),
        }
    }

    fn finalize(&mut self) -> crate::Result<String> {
        let text = self
            .recognizer
            .final_result()
            .single()
            .map(|r| r.text.to_string())
            .unwrap_or_default();
        self.partial.clear();
        self.recognizer.reset();
        Ok(text)
    }

    fn partial(&self) -> &str {
        &self.partial
    }
}
