//! HTTP routes

pub mod foods;
pub mod health;
pub mod predict;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Failure body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

/// A JSON error with its status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<food_vision::FoodVisionError> for ApiError {
    fn from(err: food_vision::FoodVisionError) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
            timestamp: now(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// RFC 3339 timestamp for response bodies
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// GET / - Service banner
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Food Vision API",
        "version": food_vision::VERSION,
        "status": "running",
        "endpoints": {
            "predict": "POST /predict - Upload image for food recognition",
            "predict_from_url": "POST /predict/from_url - Recognize food from an image URL",
            "foods": "GET /foods - List foods with nutrition facts",
            "health": "GET /health - Model and service status"
        }
    }))
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    // Leave headroom above the file limit so oversize uploads reach the handler
    let body_limit = state.config.max_file_size * 2;

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict::predict))
        .route("/predict/from_url", post(predict::predict_from_url))
        .route("/foods", get(foods::list_foods))
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
