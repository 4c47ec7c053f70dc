//! Quota API endpoint
//!
//! GET /api/v1/quota: current minute/day usage, time to reset and daily history.

use axum::{extract::State, routing::get, Json, Router};
use quizforge_core::QuotaSnapshot;

use super::response::ApiResponse;
use super::AppState;

/// GET /api/v1/quota handler.
async fn get_quota(State(state): State<AppState>) -> Json<ApiResponse<QuotaSnapshot>> {
    Json(ApiResponse::success(state.service.quota().status().await))
}

/// Create the quota routes.
pub fn quota_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/quota", get(get_quota))
        .with_state(state)
}
