//! Web API module for Quizforge
//!
//! Provides REST API endpoints for:
//! - Quiz generation from a topic or an uploaded document
//! - Session listing, lookup, deletion and answer validation
//! - Quota status
//! - Health checks

pub mod health;
pub mod quizzes;
pub mod quota;
pub mod response;
pub mod sessions;

use axum::Router;
use quizforge_core::QuizService;
use std::sync::Arc;

pub use health::health_routes;
pub use quizzes::quizzes_routes;
pub use quota::quota_routes;
pub use sessions::sessions_routes;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuizService>,
    /// Largest accepted upload, in bytes
    pub upload_max_bytes: usize,
}

impl AppState {
    pub fn new(service: Arc<QuizService>, upload_max_bytes: usize) -> Self {
        Self {
            service,
            upload_max_bytes,
        }
    }
}

/// Create the API router with all endpoints
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes(state.clone()))
        .merge(quizzes_routes(state.clone()))
        .merge(sessions_routes(state.clone()))
        .merge(quota_routes(state))
}
