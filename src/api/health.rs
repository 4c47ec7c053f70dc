//! Health check endpoints.
//!
//! Provides:
//! - `/health`: simple "healthy" + version (for load balancers)
//! - `/health/detailed`: governor counters and current quota headroom

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use quizforge_core::GovernorStats;
use serde::Serialize;

use super::AppState;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub governor: GovernorHealth,
    pub quota: QuotaHealth,
}

/// Request governor state
#[derive(Debug, Serialize)]
pub struct GovernorHealth {
    pub accepting: bool,
    #[serde(flatten)]
    pub stats: GovernorStats,
}

/// Quota headroom
#[derive(Debug, Serialize)]
pub struct QuotaHealth {
    pub exceeded: bool,
    pub requests_this_minute: u32,
    pub minute_quota: u32,
    pub requests_today: u32,
    pub daily_quota: u32,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let governor = state.service.governor();
    let snapshot = state.service.quota().status().await;

    let accepting = !governor.is_closed();
    let status = match (accepting, snapshot.is_quota_exceeded) {
        (false, _) => "unhealthy",
        (true, true) => "degraded",
        (true, false) => "healthy",
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        governor: GovernorHealth {
            accepting,
            stats: governor.stats(),
        },
        quota: QuotaHealth {
            exceeded: snapshot.is_quota_exceeded,
            requests_this_minute: snapshot.requests_this_minute,
            minute_quota: snapshot.minute_quota,
            requests_today: snapshot.requests_today,
            daily_quota: snapshot.daily_quota,
        },
    })
}

/// Create health routes
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
        .with_state(state)
}
