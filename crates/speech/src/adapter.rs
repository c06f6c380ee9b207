use std::path::Path;
use std::sync::Arc;

use crate::synth::SynthesizedAudio;
use crate::{AudioPlayer, SpeechError, Synthesizer, Translator, SOURCE_LANGUAGE};

#[derive(Debug, Clone)]
pub struct SpeakOutcome {
    /// Set only when the text was actually translated.
    pub translated_text: Option<String>,
}

/// Sequences translate → synthesize → play for one request.
///
/// Synthesized audio lands in a named temp file that is removed on every
/// exit path: the file handle owns the artifact and deletes it on drop,
/// whether playback succeeded or anything before it failed.
pub struct SpeechSynthesisAdapter {
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn AudioPlayer>,
    translator: Arc<dyn Translator>,
}

impl SpeechSynthesisAdapter {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn AudioPlayer>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            synthesizer,
            player,
            translator,
        }
    }

    /// Speak `text` in `lang`, translating first when requested and the
    /// target differs from the source language.
    pub async fn speak(
        &self,
        text: &str,
        lang: &str,
        translate: bool,
    ) -> crate::Result<SpeakOutcome> {
        if text.trim().is_empty() {
            return Err(SpeechError::NoTextProvided);
        }

        let translated = if translate && lang != SOURCE_LANGUAGE {
            Some(self.translator.translate(text, lang).await?)
        } else {
            None
        };
        let speak_text = translated.clone().unwrap_or_else(|| text.to_string());

        // Synthesis and playback block for the duration of the audio;
        // keep them off the async runtime.
        let synthesizer = self.synthesizer.clone();
        let player = self.player.clone();
        let lang = lang.to_string();
        tokio::task::spawn_blocking(move || -> crate::Result<()> {
            let audio = synthesizer.synthesize(&speak_text, &lang)?;
            let artifact = tempfile::Builder::new()
                .prefix("signbridge-tts-")
                .suffix(".wav")
                .tempfile()
                .map_err(|e| SpeechError::Synthesis(format!("failed to create temp file: {e}")))?;
            write_wav(artifact.path(), &audio)?;
            player.play_wav(artifact.path())
            // `artifact` drops here and unlinks the file on both paths.
        })
        .await
        .map_err(|e| SpeechError::Synthesis(format!("synthesis task failed: {e}")))??;

        Ok(SpeakOutcome {
            translated_text: translated,
        })
    }
}

fn write_wav(path: &Path, audio: &SynthesizedAudio) -> crate::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| SpeechError::Synthesis(format!("failed to create wav writer: {e}")))?;
    for &sample in &audio.samples {
        let int_sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(int_sample)
            .map_err(|e| SpeechError::Synthesis(format!("failed to write sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| SpeechError::Synthesis(format!("failed to finalize wav: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSynthesizer {
        calls: AtomicUsize,
        last_text: Mutex<Option<String>>,
        fail: bool,
    }

    impl Synthesizer for FakeSynthesizer {
        fn synthesize(&self, text: &str, _lang: &str) -> crate::Result<SynthesizedAudio> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_text.lock().unwrap() = Some(text.to_string());
            if self.fail {
                return Err(SpeechError::Synthesis("scripted failure".to_string()));
            }
            Ok(SynthesizedAudio {
                samples: vec![0.0; 128],
                sample_rate: 22050,
            })
        }
    }

    #[derive(Default)]
    struct FakePlayer {
        played: Mutex<Option<PathBuf>>,
        fail: bool,
    }

    impl AudioPlayer for FakePlayer {
        fn play_wav(&self, path: &Path) -> crate::Result<()> {
            assert!(path.exists(), "artifact must exist during playback");
            *self.played.lock().unwrap() = Some(path.to_path_buf());
            if self.fail {
                return Err(SpeechError::Playback("scripted failure".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, text: &str, target_lang: &str) -> crate::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("[{target_lang}] {text}"))
        }
    }

    fn adapter(
        synth: Arc<FakeSynthesizer>,
        player: Arc<FakePlayer>,
        translator: Arc<FakeTranslator>,
    ) -> SpeechSynthesisAdapter {
        SpeechSynthesisAdapter::new(synth, player, translator)
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_synthesis() {
        let synth = Arc::new(FakeSynthesizer::default());
        let a = adapter(
            synth.clone(),
            Arc::new(FakePlayer::default()),
            Arc::new(FakeTranslator::default()),
        );
        assert!(matches!(
            a.speak("   ", "en", false).await,
            Err(SpeechError::NoTextProvided)
        ));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_translation_when_target_is_source() {
        let translator = Arc::new(FakeTranslator::default());
        let synth = Arc::new(FakeSynthesizer::default());
        let a = adapter(
            synth.clone(),
            Arc::new(FakePlayer::default()),
            translator.clone(),
        );

        let outcome = a.speak("hello", "en", true).await.unwrap();
        assert!(outcome.translated_text.is_none());
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            synth.last_text.lock().unwrap().as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn test_translates_then_synthesizes_translated_text() {
        let translator = Arc::new(FakeTranslator::default());
        let synth = Arc::new(FakeSynthesizer::default());
        let a = adapter(
            synth.clone(),
            Arc::new(FakePlayer::default()),
            translator.clone(),
        );

        let outcome = a.speak("hello", "fr", true).await.unwrap();
        assert_eq!(outcome.translated_text.as_deref(), Some("[fr] hello"));
        assert_eq!(
            synth.last_text.lock().unwrap().as_deref(),
            Some("[fr] hello")
        );
    }

    #[tokio::test]
    async fn test_artifact_removed_after_success() {
        let player = Arc::new(FakePlayer::default());
        let a = adapter(
            Arc::new(FakeSynthesizer::default()),
            player.clone(),
            Arc::new(FakeTranslator::default()),
        );

        a.speak("hello", "en", false).await.unwrap();
        let path = player.played.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "artifact must not outlive the request");
    }

    #[tokio::test]
    async fn test_artifact_removed_after_playback_failure() {
        let player = Arc::new(FakePlayer {
            fail: true,
            ..Default::default()
        });
        let a = adapter(
            Arc::new(FakeSynthesizer::default()),
            player.clone(),
            Arc::new(FakeTranslator::default()),
        );

        assert!(a.speak("hello", "en", false).await.is_err());
        let path = player.played.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "artifact must not outlive a failed request");
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_error() {
        let a = adapter(
            Arc::new(FakeSynthesizer {
                fail: true,
                ..Default::default()
            }),
            Arc::new(FakePlayer::default()),
            Arc::new(FakeTranslator::default()),
        );
        assert!(matches!(
            a.speak("hello", "en", false).await,
            Err(SpeechError::Synthesis(_))
        ));
    }
}
