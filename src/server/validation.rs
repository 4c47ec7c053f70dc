//! Configuration validation
//!
//! Startup checks that abort on unusable settings, plus production warnings.

use super::config::AppConfig;
use quizforge_core::Error;
use tracing::warn;

/// Reject configuration the server cannot run with.
pub fn validate_config(config: &AppConfig) -> quizforge_core::Result<()> {
    config.quota_config().validate()?;

    if config.governor.min_interval_secs == 0 {
        return Err(Error::invalid_config(
            "governor.min_interval_secs",
            "must be greater than 0",
        ));
    }
    if config.upload.max_bytes == 0 {
        return Err(Error::invalid_config(
            "upload.max_bytes",
            "must be greater than 0",
        ));
    }
    if config.llm.max_output_tokens == 0 {
        return Err(Error::invalid_config(
            "llm.max_output_tokens",
            "must be greater than 0",
        ));
    }
    match config.llm.provider.as_str() {
        "gemini" | "mock" => {}
        other => {
            return Err(Error::invalid_config(
                "llm.provider",
                format!("unknown provider '{}', expected 'gemini' or 'mock'", other),
            ))
        }
    }
    Ok(())
}

/// Validate configuration for production security
pub fn validate_production_config(config: &AppConfig) {
    let is_production = std::env::var("QUIZFORGE_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if !is_production {
        return;
    }

    if config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Consider binding to 127.0.0.1 and using a reverse proxy."
        );
    }

    if config.server.cors_allowed_origins.is_empty() {
        warn!(
            "SECURITY WARNING: CORS allows any origin in production. \
             Set [server] cors_allowed_origins."
        );
    }

    if config.llm.provider == "mock" {
        warn!("Mock LLM provider is configured in production; quizzes will be canned");
    }
}
