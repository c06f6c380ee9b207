use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use signbridge_detect::{
    build_report, decode_base64_image, DetectError, DetectionReport, GestureDetector,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub detector: Arc<dyn GestureDetector>,
    pub model_loaded: bool,
    pub model_path: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/detect", post(detect))
        .route("/health", get(health))
        .route("/", get(home))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
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

impl From<DetectError> for ApiError {
    fn from(e: DetectError) -> Self {
        let status = match &e {
            DetectError::NoImageProvided | DetectError::InvalidImage => StatusCode::BAD_REQUEST,
            DetectError::ModelLoad(_) | DetectError::Inference(_) => {
                tracing::error!(error = %e, "detection failed");
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
struct DetectBody {
    image: Option<String>,
}

async fn detect(
    State(state): State<Arc<AppState>>,
    body: Option<Json<DetectBody>>,
) -> Result<Json<DetectionReport>, ApiError> {
    let image_data = body
        .and_then(|Json(b)| b.image)
        .ok_or(DetectError::NoImageProvided)?;

    let image = decode_base64_image(&image_data)?;

    // Inference is CPU-bound; keep it off the async workers.
    let detector = state.detector.clone();
    let detections = tokio::task::spawn_blocking(move || detector.detect(&image))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        })??;

    Ok(Json(build_report(
        &detections,
        state.detector.is_degraded(),
    )))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.model_loaded,
        "model_path": state.model_path,
    }))
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Sign Language Detection API",
        "endpoints": {
            "/detect": "POST - Send base64 image for sign language detection",
            "/health": "GET - Check API health",
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use signbridge_detect::DegradedDetector;
    use std::io::Cursor;

    fn degraded_state() -> Arc<AppState> {
        Arc::new(AppState {
            detector: Arc::new(DegradedDetector),
            model_loaded: false,
            model_path: "sign_language_model.onnx".to_string(),
        })
    }

    fn png_base64() -> String {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        BASE64.encode(&bytes)
    }

    #[tokio::test]
    async fn test_missing_image_is_bad_request() {
        let err = detect(State(degraded_state()), None).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No image data provided");

        let err = detect(
            State(degraded_state()),
            Some(Json(DetectBody { image: None })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_image_is_bad_request() {
        let err = detect(
            State(degraded_state()),
            Some(Json(DetectBody {
                image: Some("@@not-base64@@".to_string()),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid image data");
    }

    #[tokio::test]
    async fn test_degraded_mode_still_answers() {
        let Json(report) = detect(
            State(degraded_state()),
            Some(Json(DetectBody {
                image: Some(png_base64()),
            })),
        )
        .await
        .unwrap();

        assert!(report.degraded);
        assert_eq!(report.detected_words.len(), 1);
        assert_eq!(report.total_detections, 1);
    }

    #[tokio::test]
    async fn test_health_reports_model_state() {
        let Json(body) = health(State(degraded_state())).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["model_path"], "sign_language_model.onnx");
    }
}
