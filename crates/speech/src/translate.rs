use async_trait::async_trait;

use crate::SpeechError;

/// Translates text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> crate::Result<String>;
}

const TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Free web translation endpoint, auto-detecting the source language.
pub struct HttpTranslator {
    client: reqwest::Client,
}

impl HttpTranslator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> crate::Result<String> {
        let response = self
            .client
            .get(TRANSLATE_ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| SpeechError::Translation(e.to_string()))?
            .error_for_status()
            .map_err(|e| SpeechError::Translation(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SpeechError::Translation(e.to_string()))?;

        parse_translation(&body)
    }
}

/// The endpoint returns nested arrays; the translation is the first
/// element of each segment under the first top-level entry.
fn parse_translation(body: &serde_json::Value) -> crate::Result<String> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| SpeechError::Translation("unexpected response shape".to_string()))?;

    let mut translated = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
            translated.push_str(piece);
        }
    }

    if translated.is_empty() {
        return Err(SpeechError::Translation("empty translation".to_string()));
    }
    Ok(translated)
}
