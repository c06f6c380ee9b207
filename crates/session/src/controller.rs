use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use signbridge_audio::{AudioError, CaptureConfig, MicCapture};
use signbridge_models::ModelCatalog;
use signbridge_stt::{StreamingRecognizer, VoskRecognizer};

use crate::worker::{drain_loop, Transcript};
use crate::SessionError;

pub const DEFAULT_LANGUAGE: &str = "en";

/// The capture half a session owns. Dropping it must stop the underlying
/// stream and disconnect the frame channel so the drain worker can finish.
pub trait CaptureStream: Send {
    /// Take the frame receiver (available exactly once per capture).
    fn take_receiver(&mut self) -> Option<Receiver<Vec<i16>>>;
}

impl CaptureStream for MicCapture {
    fn take_receiver(&mut self) -> Option<Receiver<Vec<i16>>> {
        MicCapture::take_receiver(self)
    }
}

/// Factory for capture streams, injected so the controller does not care
/// whether frames come from a microphone or a test fixture.
pub trait CaptureOpener: Send + Sync {
    fn open(&self) -> signbridge_audio::Result<Box<dyn CaptureStream>>;
}

/// Opens the host microphone via cpal.
pub struct MicOpener {
    pub device: Option<String>,
}

impl CaptureOpener for MicOpener {
    fn open(&self) -> signbridge_audio::Result<Box<dyn CaptureStream>> {
        let capture = MicCapture::open(CaptureConfig {
            device: self.device.clone(),
        })?;
        Ok(Box::new(capture))
    }
}

/// Factory for recognizers, keyed by the resolved model directory.
pub trait RecognizerLoader: Send + Sync {
    fn load(&self, model_dir: &Path) -> signbridge_stt::Result<Box<dyn StreamingRecognizer>>;
}

/// Loads vosk models from the catalog's directories.
pub struct VoskLoader;

impl RecognizerLoader for VoskLoader {
    fn load(&self, model_dir: &Path) -> signbridge_stt::Result<Box<dyn StreamingRecognizer>> {
        Ok(Box::new(VoskRecognizer::load(model_dir)?))
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StartInfo {
    pub language: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStatus {
    pub listening: bool,
    pub model_loaded: bool,
    pub current_language: String,
    pub supported_languages: Vec<String>,
    pub partial_text: String,
}

struct ActiveSession {
    capture: Box<dyn CaptureStream>,
    worker: JoinHandle<()>,
}

struct Inner {
    active: Option<ActiveSession>,
    current_language: String,
    transcript: Arc<Mutex<Transcript>>,
}

/// Owns the singleton listening session.
///
/// `start`, `stop`, `status` and the drain worker all serialize through
/// the controller mutex or the shared transcript mutex; a failed request
/// leaves the session state untouched.
pub struct SessionController {
    catalog: ModelCatalog,
    opener: Box<dyn CaptureOpener>,
    loader: Box<dyn RecognizerLoader>,
    inner: Mutex<Inner>,
}

impl SessionController {
    pub fn new(
        catalog: ModelCatalog,
        opener: Box<dyn CaptureOpener>,
        loader: Box<dyn RecognizerLoader>,
    ) -> Self {
        Self {
            catalog,
            opener,
            loader,
            inner: Mutex::new(Inner {
                active: None,
                current_language: DEFAULT_LANGUAGE.to_string(),
                transcript: Arc::new(Mutex::new(Transcript::default())),
            }),
        }
    }

    /// Controller wired to the host microphone and vosk models.
    pub fn with_microphone(catalog: ModelCatalog, device: Option<String>) -> Self {
        Self::new(catalog, Box::new(MicOpener { device }), Box::new(VoskLoader))
    }

    /// Begin a listening session.
    ///
    /// The language is validated against the catalog before any capture
    /// resource is acquired; an active session is never disturbed by a
    /// failed start.
    pub fn start(&self, language: Option<&str>) -> crate::Result<StartInfo> {
        let language = language.unwrap_or(DEFAULT_LANGUAGE);
        let model_dir = self.catalog.resolve(language)?;

        let mut inner = self.inner.lock().expect("session mutex poisoned");
        if inner.active.is_some() {
            return Err(SessionError::AlreadyListening);
        }

        let recognizer = self.loader.load(model_dir)?;
        let mut capture = self.opener.open()?;
        let frames = capture.take_receiver().ok_or_else(|| {
            SessionError::Audio(AudioError::StreamError(
                "capture receiver already taken".to_string(),
            ))
        })?;

        let transcript = Arc::new(Mutex::new(Transcript::default()));
        inner.transcript = transcript.clone();
        let worker = std::thread::spawn(move || drain_loop(frames, recognizer, transcript));

        inner.active = Some(ActiveSession { capture, worker });
        inner.current_language = language.to_string();
        tracing::info!(language, "listening session started");

        Ok(StartInfo {
            language: language.to_string(),
        })
    }

    /// End the session and return the accumulated transcript.
    ///
    /// Closing the capture disconnects the frame channel; the worker
    /// drains every queued frame, flushes the recognizer and exits, so
    /// the text read after the join is settled regardless of timing.
    pub fn stop(&self) -> crate::Result<String> {
        let mut inner = self.inner.lock().expect("session mutex poisoned");
        let active = inner.active.take().ok_or(SessionError::NotListening)?;

        drop(active.capture);
        if active.worker.join().is_err() {
            tracing::error!("drain worker panicked");
        }

        let text = inner
            .transcript
            .lock()
            .expect("transcript mutex poisoned")
            .accumulated
            .clone();
        tracing::info!(chars = text.len(), "listening session stopped");
        Ok(text)
    }

    /// Snapshot of the session state; never fails, no side effects.
    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().expect("session mutex poisoned");
        let transcript = inner.transcript.lock().expect("transcript mutex poisoned");

        let partial_text = match (
            transcript.accumulated.is_empty(),
            transcript.partial.is_empty(),
        ) {
            (true, _) => transcript.partial.clone(),
            (false, true) => transcript.accumulated.clone(),
            (false, false) => format!("{} {}", transcript.accumulated, transcript.partial),
        };

        SessionStatus {
            listening: inner.active.is_some(),
            model_loaded: self.catalog.any_installed(),
            current_language: inner.current_language.clone(),
            supported_languages: self
                .catalog
                .supported_languages()
                .into_iter()
                .map(String::from)
                .collect(),
            partial_text,
        }
    }
}
