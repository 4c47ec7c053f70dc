//! Server initialization
//!
//! Wires configuration, the quota tracker, the request governor and the
//! quiz service into the HTTP router, then runs until a shutdown signal.

use super::config::AppConfig;
use super::loader::load_config;
use super::providers::resolve_llm_provider;
use super::validation::{validate_config, validate_production_config};
use crate::api::{api_router, AppState};
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use quizforge_core::{
    FileQuotaStore, MemorySessionStore, QuizOptions, QuizService, QuotaTracker, RequestGovernor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Multipart framing overhead allowed on top of the file size limit
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the quiz service and its collaborators from configuration.
pub async fn build_service(config: &AppConfig) -> Result<Arc<QuizService>> {
    let state_path = config.quota_state_path();
    let quota = Arc::new(QuotaTracker::new(
        config.quota_config(),
        Arc::new(FileQuotaStore::new(state_path.clone())),
    ));
    let state = quota.init().await;
    info!(
        path = %state_path.display(),
        requests_today = state.requests_today,
        minute_quota = state.minute_quota,
        daily_quota = state.daily_quota,
        "Quota tracker ready"
    );

    let governor = Arc::new(RequestGovernor::new(config.governor_config()));
    info!(
        min_interval_secs = config.governor.min_interval_secs,
        max_retries = config.governor.max_retries,
        "Request governor started"
    );

    let provider = resolve_llm_provider(&config.llm)?;
    let sessions = Arc::new(MemorySessionStore::new());

    let options = QuizOptions {
        model: config.llm.model.clone().unwrap_or_default(),
        max_output_tokens: config.llm.max_output_tokens,
        ..QuizOptions::default()
    };

    Ok(Arc::new(
        QuizService::new(quota, governor, provider, sessions).with_options(options),
    ))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.server.cors_allowed_origins;
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Assemble the full application router.
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    api_router(state)
        .layer(DefaultBodyLimit::max(
            config.upload.max_bytes + UPLOAD_OVERHEAD_BYTES,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config)),
        )
}

/// Run the Quizforge server
pub async fn run() -> Result<()> {
    let config = load_config()?;
    validate_config(&config).context("Invalid configuration")?;
    validate_production_config(&config);

    let service = build_service(&config).await?;
    let state = AppState::new(service.clone(), config.upload.max_bytes);
    let app = build_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down request governor...");
    service.governor().close().await;
    service.quota().close().await;

    info!("Quizforge shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
