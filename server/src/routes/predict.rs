//! Prediction endpoints - classify an uploaded or linked food photo

use std::time::Instant;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use food_vision::PredictionResult;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{now, ApiError};
use crate::state::{SharedState, ALLOWED_EXTENSIONS};

const MISSING_IMAGE: &str = "No image file provided. Please upload an image with 'image' key.";
const MISSING_URL: &str = "No image_url provided";

/// Successful prediction body
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: PredictionResult,
    pub timestamp: String,
    /// Identifier of this upload; nothing is stored under it
    pub image_id: String,
    pub processing_time_ms: f64,
}

/// Whether `filename` has one of the accepted extensions
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

fn too_large(max_file_size: usize) -> ApiError {
    ApiError::bad_request(format!(
        "File too large. Max size: {}MB",
        max_file_size / (1024 * 1024)
    ))
}

/// Body-limit errors are reported as oversize files, anything else as a malformed form
fn upload_error(e: MultipartError, max_file_size: usize) -> ApiError {
    warn!("Failed to read upload: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_file_size)
    } else {
        ApiError::bad_request(format!("Invalid upload: {}", e))
    }
}

/// Pull the `image` field out of the form and validate it
async fn read_upload(mut multipart: Multipart, max_file_size: usize) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::bad_request(MISSING_IMAGE)),
            Err(e) => return Err(upload_error(e, max_file_size)),
        };

        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        if !allowed_file(&filename) {
            return Err(ApiError::bad_request(format!(
                "File type not allowed. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error(e, max_file_size))?;
        if bytes.len() > max_file_size {
            return Err(too_large(max_file_size));
        }

        return Ok(bytes.to_vec());
    }
}

/// Fetch `url` into memory, refusing bodies over `max_file_size`
async fn download(
    client: &reqwest::Client,
    url: &str,
    max_file_size: usize,
) -> Result<Vec<u8>, ApiError> {
    let failed = |e: reqwest::Error| {
        warn!("Failed to download {}: {}", url, e);
        ApiError::internal(format!("Failed to download image: {}", e))
    };

    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(failed)?;

    if response
        .content_length()
        .is_some_and(|len| len > max_file_size as u64)
    {
        return Err(too_large(max_file_size));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(failed)? {
        if bytes.len() + chunk.len() > max_file_size {
            return Err(too_large(max_file_size));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// POST /predict - Classify an uploaded image
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let multipart = multipart.map_err(|_| ApiError::bad_request(MISSING_IMAGE))?;
    let bytes = read_upload(multipart, state.config.max_file_size).await?;
    classify(&state, bytes).await
}

/// POST /predict/from_url - Classify the image behind `{"image_url": ...}`
pub async fn predict_from_url(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::bad_request(MISSING_URL))?;
    let url = payload
        .get("image_url")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request(MISSING_URL))?;

    let bytes = download(&state.http, url, state.config.max_file_size).await?;
    classify(&state, bytes).await
}

/// Run the predictor off the async workers and wrap the result
async fn classify(state: &SharedState, bytes: Vec<u8>) -> Result<Json<PredictResponse>, ApiError> {
    let image_id = format!("{}.jpg", Uuid::new_v4());
    let start = Instant::now();

    let predictor = state.predictor.clone();
    let result = tokio::task::spawn_blocking(move || predictor.predict(&bytes))
        .await
        .map_err(|e| {
            error!("Prediction task panicked: {}", e);
            ApiError::internal(format!("prediction task failed: {}", e))
        })?
        .map_err(|e| {
            warn!("Prediction failed for {} ({}): {}", image_id, e.kind(), e);
            ApiError::from(e)
        })?;

    let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        "{} -> {} ({:.3}) in {:.1}ms",
        image_id, result.top_label, result.confidence, processing_time_ms
    );

    Ok(Json(PredictResponse {
        success: true,
        result,
        timestamp: now(),
        image_id,
        processing_time_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::router;
    use crate::routes::testing::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("lunch.jpg"));
        assert!(allowed_file("LUNCH.PNG"));
        assert!(allowed_file("archive.tar.gif"));
        assert!(!allowed_file("lunch.bmp"));
        assert!(!allowed_file("jpg"));
    }

    #[tokio::test]
    async fn test_predict_success() {
        let response = router(state())
            .oneshot(upload(multipart("image", "meal.png", &png())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["food"], "Rendang");
        assert_eq!(body["top_predictions"][0]["food"], "Rendang");
        assert_eq!(body["top_predictions"][1]["food"], "Pizza");
        assert_eq!(body["top_predictions"].as_array().unwrap().len(), 3);
        assert!(body["recommendation"].as_str().unwrap().contains("coconut milk"));
        assert!(body["image_id"].as_str().unwrap().ends_with(".jpg"));
        assert!(body["timestamp"].is_string());
        assert!(body["processing_time_ms"].is_number());
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let response = router(state())
            .oneshot(upload(multipart("photo", "meal.png", &png())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], MISSING_IMAGE);
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let response = router(state())
            .oneshot(upload(multipart("image", "", &png())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No selected file");
    }

    #[tokio::test]
    async fn test_disallowed_extension() {
        let response = router(state())
            .oneshot(upload(multipart("image", "meal.bmp", &png())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("File type not allowed"));
    }

    #[tokio::test]
    async fn test_too_large() {
        let big = vec![0u8; crate::state::MAX_FILE_SIZE + 1];
        let response = router(state())
            .oneshot(upload(multipart("image", "meal.jpg", &big)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "File too large. Max size: 5MB");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_client_error() {
        let response = router(state())
            .oneshot(upload(multipart("image", "meal.jpg", b"not an image at all")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to decode image"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_truncated_form_is_invalid_upload() {
        let mut body = multipart("image", "meal.png", &png());
        body.truncate(body.len() - format!("\r\n--{BOUNDARY}--\r\n").len());

        let response = router(state()).oneshot(upload(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid upload"));
    }

    #[tokio::test]
    async fn test_body_over_limit_is_too_large() {
        let huge = vec![0u8; crate::state::MAX_FILE_SIZE * 2 + 1];
        let response = router(state())
            .oneshot(upload(multipart("image", "meal.jpg", &huge)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "File too large. Max size: 5MB");
    }

    #[tokio::test]
    async fn test_from_url_missing_key() {
        let response = router(state())
            .oneshot(post_json("/predict/from_url", json!({ "url": "http://example.com/a.jpg" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], MISSING_URL);
    }

    #[tokio::test]
    async fn test_from_url_requires_json_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/predict/from_url")
            .body(Body::from("image_url=http://example.com/a.jpg"))
            .unwrap();
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], MISSING_URL);
    }

    #[tokio::test]
    async fn test_from_url_download_failure() {
        // Nothing listens on port 1
        let response = router(state())
            .oneshot(post_json(
                "/predict/from_url",
                json!({ "image_url": "http://127.0.0.1:1/food.jpg" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to download image"));
    }

    #[tokio::test]
    async fn test_from_url_not_found_is_download_failure() {
        let url = serve_image(png()).await.replace("food.png", "missing.png");
        let response = router(state())
            .oneshot(post_json("/predict/from_url", json!({ "image_url": url })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_from_url_success() {
        let url = serve_image(png()).await;
        let response = router(state())
            .oneshot(post_json("/predict/from_url", json!({ "image_url": url })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["food"], "Rendang");
        assert_eq!(body["top_predictions"].as_array().unwrap().len(), 3);
        assert!(body["processing_time_ms"].is_number());
    }

    #[tokio::test]
    async fn test_from_url_too_large() {
        let url = serve_image(vec![0u8; crate::state::MAX_FILE_SIZE + 1]).await;
        let response = router(state())
            .oneshot(post_json("/predict/from_url", json!({ "image_url": url })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "File too large. Max size: 5MB");
    }
}
