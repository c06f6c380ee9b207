use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use piper_rs::synth::PiperSpeechSynthesizer;

use crate::SpeechError;

/// Piper voices emit mono audio at this rate.
const PIPER_SAMPLE_RATE: u32 = 22050;

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Turns text into PCM samples for a given language.
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, text: &str, lang: &str) -> crate::Result<SynthesizedAudio>;
}

/// Piper-backed synthesis with one loaded voice per configured language.
///
/// Voices are loaded eagerly so a bad voice config is a startup diagnostic
/// rather than a request-time failure.
pub struct PiperSynthesizer {
    voices: HashMap<String, Arc<PiperSpeechSynthesizer>>,
}

impl PiperSynthesizer {
    /// Load every configured `(language, voice config path)` pair.
    pub fn load(voices: &[(String, PathBuf)]) -> crate::Result<Self> {
        let mut loaded = HashMap::new();
        for (lang, config_path) in voices {
            let synth = load_voice(config_path)?;
            tracing::info!(lang, config = %config_path.display(), "voice loaded");
            loaded.insert(lang.clone(), Arc::new(synth));
        }
        Ok(Self { voices: loaded })
    }

    pub fn languages(&self) -> Vec<&str> {
        self.voices.keys().map(String::as_str).collect()
    }
}

fn load_voice(config_path: &Path) -> crate::Result<PiperSpeechSynthesizer> {
    let model = piper_rs::from_config_path(config_path)
        .map_err(|e| SpeechError::Synthesis(format!("failed to load voice config: {e}")))?;
    PiperSpeechSynthesizer::new(model)
        .map_err(|e| SpeechError::Synthesis(format!("failed to create synthesizer: {e}")))
}

impl Synthesizer for PiperSynthesizer {
    fn synthesize(&self, text: &str, lang: &str) -> crate::Result<SynthesizedAudio> {
        let synth = self.voices.get(lang).ok_or_else(|| {
            SpeechError::Synthesis(format!("no voice configured for language '{lang}'"))
        })?;

        let chunks = synth
            .synthesize_parallel(text.to_string(), None)
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        for chunk in chunks {
            let chunk = chunk.map_err(|e| SpeechError::Synthesis(e.to_string()))?;
            samples.extend(chunk.into_vec());
        }

        Ok(SynthesizedAudio {
            samples,
            sample_rate: PIPER_SAMPLE_RATE,
        })
    }
}
