//! Speech-to-text HTTP service.
//!
//! Drives the singleton listening session: `/stt/start` opens the
//! microphone, `/stt/stop` returns the transcript, `/stt/status` reports
//! state. One process, one microphone, one session at a time.

mod api;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use signbridge_models::ModelCatalog;
use signbridge_session::SessionController;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "signbridge-stt-api", about = "Streaming speech-to-text service")]
struct Config {
    /// Port to listen on.
    #[arg(long, env = "SIGNBRIDGE_STT_PORT", default_value_t = 5002)]
    port: u16,

    /// Root directory containing the recognizer model directories.
    #[arg(long, env = "SIGNBRIDGE_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Input device name; defaults to the host default microphone.
    #[arg(long, env = "SIGNBRIDGE_INPUT_DEVICE")]
    device: Option<String>,
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
    let models_dir = config
        .models_dir
        .unwrap_or_else(signbridge_models::default_models_dir);

    let catalog = ModelCatalog::with_defaults(&models_dir);
    let available = catalog.validate();
    if available.is_empty() {
        tracing::warn!(
            models_dir = %models_dir.display(),
            "no recognizer models installed; every start request will fail"
        );
    }

    let controller = Arc::new(SessionController::with_microphone(catalog, config.device));
    let app = api::router(controller);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "starting speech-to-text service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
