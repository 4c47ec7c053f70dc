//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("QUIZFORGE_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") makes QUIZFORGE_QUOTA__MINUTE_QUOTA work with a
        // single underscore after the prefix.
        .add_source(
            Environment::with_prefix("QUIZFORGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8090);
        assert_eq!(config.quota.minute_quota, 15);
        assert_eq!(config.quota.daily_quota, 120);
        assert_eq!(config.governor.min_interval_secs, 30);
        assert_eq!(config.governor.max_retries, 3);
        assert_eq!(config.llm.provider, "gemini");
    }

    #[test]
    fn test_governor_config_conversion() {
        let config = AppConfig::default();
        let governor = config.governor_config();

        assert_eq!(governor.min_interval, std::time::Duration::from_secs(30));
        assert_eq!(
            governor.post_success_pause,
            std::time::Duration::from_millis(1000)
        );
        assert_eq!(governor.max_retries, 3);
    }

    #[test]
    fn test_state_file_defaults_into_data_dir() {
        let config = AppConfig {
            data_dir: Some("/tmp/quizforge-test".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(
            config.quota_state_path(),
            std::path::PathBuf::from("/tmp/quizforge-test/quota_state.json")
        );
    }
}
