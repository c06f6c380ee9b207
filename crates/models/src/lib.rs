//! Language-to-model catalog for the speech recognizer.
//!
//! Model locations are injected configuration: a root directory plus a
//! mapping of language code to model directory, validated at startup so a
//! missing model is a diagnostic instead of a mid-session surprise.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("model for '{code}' not installed at {path}")]
    NotInstalled { code: String, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Default recognizer model directories, relative to the catalog root.
const DEFAULT_MODELS: &[(&str, &str)] = &[
    ("en", "vosk-model-small-en-us-0.15"),
    ("hi", "vosk-model-small-hi-0.22"),
    ("fr", "vosk-model-small-fr-0.22"),
    ("de", "vosk-model-small-de-0.15"),
];

#[derive(Debug, Clone)]
struct CatalogEntry {
    code: String,
    dir: PathBuf,
}

/// Ordered mapping of language code to recognizer model directory.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModelCatalog {
    /// Catalog with the default language set rooted at `root`.
    pub fn with_defaults(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let entries = DEFAULT_MODELS
            .iter()
            .map(|(code, dir)| CatalogEntry {
                code: (*code).to_string(),
                dir: root.join(dir),
            })
            .collect();
        Self { entries }
    }

    /// Add or replace a language mapping.
    pub fn insert(&mut self, code: impl Into<String>, dir: impl Into<PathBuf>) {
        let code = code.into();
        let dir = dir.into();
        match self.entries.iter_mut().find(|e| e.code == code) {
            Some(entry) => entry.dir = dir,
            None => self.entries.push(CatalogEntry { code, dir }),
        }
    }

    /// Language codes in configuration order.
    pub fn supported_languages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.code.as_str()).collect()
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    pub fn is_installed(&self, code: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.code == code && e.dir.is_dir())
    }

    /// True when at least one configured model is present on disk.
    pub fn any_installed(&self) -> bool {
        self.entries.iter().any(|e| e.dir.is_dir())
    }

    /// Resolve a language code to its model directory.
    ///
    /// Distinguishes a code that was never configured from one whose model
    /// directory is missing on disk.
    pub fn resolve(&self, code: &str) -> Result<&Path> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.code == code)
            .ok_or_else(|| ModelError::UnsupportedLanguage(code.to_string()))?;
        if !entry.dir.is_dir() {
            return Err(ModelError::NotInstalled {
                code: entry.code.clone(),
                path: entry.dir.clone(),
            });
        }
        Ok(&entry.dir)
    }

    /// Log the installation state of every configured model and return the
    /// codes that are actually usable. Called once at service startup.
    pub fn validate(&self) -> Vec<&str> {
        let mut available = Vec::new();
        for entry in &self.entries {
            if entry.dir.is_dir() {
                tracing::info!(code = %entry.code, path = %entry.dir.display(), "model installed");
                available.push(entry.code.as_str());
            } else {
                tracing::warn!(
                    code = %entry.code,
                    path = %entry.dir.display(),
                    "model missing; language will be rejected"
                );
            }
        }
        available
    }
}

/// Default catalog root when no directory is configured.
pub fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signbridge")
        .join("models")
}
