//! Food catalog endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use super::now;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct FoodsResponse {
    pub success: bool,
    pub count: usize,
    pub foods: Vec<String>,
    pub timestamp: String,
}

/// GET /foods - List every food in the nutrition catalog
pub async fn list_foods(State(state): State<SharedState>) -> Json<FoodsResponse> {
    let foods = state.predictor.list_known_foods();
    Json(FoodsResponse {
        success: true,
        count: foods.len(),
        foods,
        timestamp: now(),
    })
}
