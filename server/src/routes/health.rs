//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use super::now;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    /// `healthy`, or `degraded` when the class names fell back to the sentinel
    pub status: String,
    pub model_loaded: bool,
    pub class_count: usize,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: String,
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let health = state.predictor.health();
    let degraded = !health.model_loaded || state.predictor.classes().is_sentinel();

    Json(HealthResponse {
        success: true,
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        model_loaded: health.model_loaded,
        class_count: health.class_count,
        uptime_seconds: state.uptime_seconds(),
        version: food_vision::VERSION.to_string(),
        timestamp: now(),
    })
}

#[cfg(test)]
mod tests {
    use crate::routes::router;
    use crate::routes::testing::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use food_vision::ClassRegistry;
    use tower::ServiceExt;

    fn get_health() -> Request<Body> {
        Request::builder().uri("/health").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_healthy() {
        let response = router(state()).oneshot(get_health()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["class_count"], 3);
        assert!(body["uptime_seconds"].is_u64());
        assert_eq!(body["version"], food_vision::VERSION);
    }

    #[tokio::test]
    async fn test_health_degraded_with_sentinel_registry() {
        let response = router(state_with(ClassRegistry::sentinel()))
            .oneshot(get_health())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["class_count"], 1);
    }
}
