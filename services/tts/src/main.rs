//! Text-to-speech HTTP service.
//!
//! `/tts` synthesizes the posted text (translating it first on request)
//! and plays the audio on the host output device. Synthesis artifacts are
//! request-scoped and never survive the response.

mod api;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use signbridge_speech::{HttpTranslator, PiperSynthesizer, RodioPlayer, SpeechSynthesisAdapter};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "signbridge-tts-api", about = "Text-to-speech and translation service")]
struct Config {
    /// Port to listen on.
    #[arg(long, env = "SIGNBRIDGE_TTS_PORT", default_value_t = 5001)]
    port: u16,

    /// Directory of piper voice configs, one `<lang>.onnx.json` per
    /// language (e.g. `en.onnx.json`).
    #[arg(long, env = "SIGNBRIDGE_VOICES_DIR")]
    voices_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,signbridge=debug")),
        )
        .init();

    let config = Config::parse();
    let voices_dir = config.voices_dir.unwrap_or_else(default_voices_dir);

    let voices = scan_voices(&voices_dir)?;
    if voices.is_empty() {
        tracing::warn!(
            voices_dir = %voices_dir.display(),
            "no voices found; every synthesis request will fail"
        );
    }
    let synthesizer = PiperSynthesizer::load(&voices)?;
    tracing::info!(languages = ?synthesizer.languages(), "voices ready");

    let adapter = Arc::new(SpeechSynthesisAdapter::new(
        Arc::new(synthesizer),
        Arc::new(RodioPlayer),
        Arc::new(HttpTranslator::new()),
    ));
    let app = api::router(adapter);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "starting text-to-speech service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn default_voices_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signbridge")
        .join("voices")
}

/// Map `<lang>.onnx.json` files in the voices directory to languages.
fn scan_voices(dir: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut voices = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "voices directory unreadable");
            return Ok(voices);
        }
    };

    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(lang) = name.strip_suffix(".onnx.json") {
            voices.push((lang.to_string(), path.clone()));
        }
    }
    voices.sort();
    Ok(voices)
}
