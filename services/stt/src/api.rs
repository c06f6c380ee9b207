use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use signbridge_models::ModelError;
use signbridge_session::{SessionController, SessionError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(controller: Arc<SessionController>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stt/start", post(start))
        .route("/stt/stop", post(stop))
        .route("/stt/status", get(status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

/// Request-scoped error carrying the status the taxonomy assigns it.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let status = match &e {
            // State conflicts and unknown language codes are the caller's
            // mistake; missing models and device failures are ours.
            SessionError::AlreadyListening | SessionError::NotListening => StatusCode::BAD_REQUEST,
            SessionError::Model(ModelError::UnsupportedLanguage(_)) => StatusCode::BAD_REQUEST,
            SessionError::Model(ModelError::NotInstalled { .. })
            | SessionError::Audio(_)
            | SessionError::Stt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "session request failed");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct StartBody {
    language: Option<String>,
}

async fn start(
    State(controller): State<Arc<SessionController>>,
    body: Option<Json<StartBody>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let language = body.and_then(|Json(b)| b.language);

    // Model loading can take a while; keep it off the async workers.
    let info = tokio::task::spawn_blocking(move || controller.start(language.as_deref()))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        })??;

    Ok(Json(json!({
        "success": true,
        "message": format!("Started listening in {}", info.language),
        "language": info.language,
    })))
}

async fn stop(
    State(controller): State<Arc<SessionController>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let text = tokio::task::spawn_blocking(move || controller.stop())
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        })??;

    Ok(Json(json!({
        "success": true,
        "text": text,
        "message": "Stopped listening",
    })))
}

async fn status(State(controller): State<Arc<SessionController>>) -> Response {
    Json(controller.status()).into_response()
}
