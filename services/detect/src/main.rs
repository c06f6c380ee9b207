//! Sign-language gesture detection HTTP service.
//!
//! `/detect` classifies gestures in a base64 image. The detector is chosen
//! once at startup: the configured ONNX model when it is present, otherwise
//! an explicit degraded fallback that keeps the endpoint answering.

mod api;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use signbridge_detect::{
    DegradedDetector, GestureDetector, OnnxGestureDetector, DEFAULT_CONFIDENCE_THRESHOLD,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "signbridge-detect-api", about = "Sign-language gesture detection service")]
struct Config {
    /// Port to listen on.
    #[arg(long, env = "SIGNBRIDGE_DETECT_PORT", default_value_t = 8003)]
    port: u16,

    /// Path to the gesture detection model (ONNX).
    #[arg(long, env = "SIGNBRIDGE_DETECT_MODEL")]
    model: Option<PathBuf>,

    /// Label file, one gesture name per line; defaults to `labels.txt`
    /// next to the model.
    #[arg(long, env = "SIGNBRIDGE_DETECT_LABELS")]
    labels: Option<PathBuf>,

    /// Minimum confidence to report a detection.
    #[arg(long, env = "SIGNBRIDGE_DETECT_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence_threshold: f32,
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
    let model_path = config
        .model
        .unwrap_or_else(|| PathBuf::from("sign_language_model.onnx"));

    let detector = build_detector(&model_path, config.labels.as_deref(), config.confidence_threshold);
    let state = api::AppState {
        model_loaded: !detector.is_degraded(),
        model_path: model_path.display().to_string(),
        detector,
    };
    let app = api::router(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "starting gesture detection service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Prefer the real model; fall back to the degraded detector when the
/// model is absent or refuses to load. The fallback keeps `/detect`
/// answering, clearly labeled, instead of failing every request.
fn build_detector(
    model_path: &Path,
    labels_path: Option<&Path>,
    confidence_threshold: f32,
) -> Arc<dyn GestureDetector> {
    if !model_path.is_file() {
        tracing::warn!(
            model = %model_path.display(),
            "model not found; running in degraded mode"
        );
        return Arc::new(DegradedDetector);
    }

    let labels = load_labels(model_path, labels_path);
    match OnnxGestureDetector::load(model_path, labels, confidence_threshold) {
        Ok(detector) => Arc::new(detector),
        Err(e) => {
            tracing::error!(error = %e, "model failed to load; running in degraded mode");
            Arc::new(DegradedDetector)
        }
    }
}

fn load_labels(model_path: &Path, labels_path: Option<&Path>) -> Vec<String> {
    let path = labels_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| model_path.with_file_name("labels.txt"));

    match std::fs::read_to_string(&path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        Err(e) => {
            tracing::warn!(
                labels = %path.display(),
                error = %e,
                "label file unreadable; class indices will be reported"
            );
            Vec::new()
        }
    }
}
