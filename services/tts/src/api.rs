use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use signbridge_speech::{SpeechError, SpeechSynthesisAdapter};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(adapter: Arc<SpeechSynthesisAdapter>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tts", post(tts))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(adapter)
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SpeechError> for ApiError {
    fn from(e: SpeechError) -> Self {
        let status = match &e {
            SpeechError::NoTextProvided => StatusCode::BAD_REQUEST,
            SpeechError::Synthesis(_) | SpeechError::Translation(_) | SpeechError::Playback(_) => {
                tracing::error!(error = %e, "tts request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TtsBody {
    #[serde(default)]
    text: String,
    #[serde(default = "default_lang")]
    lang: String,
    #[serde(default)]
    translate: bool,
}

fn default_lang() -> String {
    "en".to_string()
}

async fn tts(
    State(adapter): State<Arc<SpeechSynthesisAdapter>>,
    body: Option<Json<TtsBody>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body.ok_or(SpeechError::NoTextProvided)?;

    let outcome = adapter
        .speak(&body.text, &body.lang, body.translate)
        .await?;

    let mut response = json!({ "success": true });
    if let Some(translated) = outcome.translated_text {
        response["translated_text"] = json!(translated);
    }
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_defaults_match_contract() {
        let body: TtsBody = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(body.text, "hi");
        assert_eq!(body.lang, "en");
        assert!(!body.translate);
    }

    #[test]
    fn test_missing_text_defaults_to_empty() {
        // The adapter rejects empty text with the validation error.
        let body: TtsBody = serde_json::from_str(r#"{"lang":"fr"}"#).unwrap();
        assert!(body.text.is_empty());
    }

    #[test]
    fn test_no_text_is_bad_request() {
        let err = ApiError::from(SpeechError::NoTextProvided);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No text provided");
    }

    #[test]
    fn test_library_failures_are_server_errors() {
        let err = ApiError::from(SpeechError::Synthesis("boom".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "synthesis failed: boom");
    }
}
