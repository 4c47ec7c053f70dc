//! Server configuration types
//!
//! Contains all configuration structures for the Quizforge server.

use quizforge_core::{GovernorConfig, QuotaConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub quota: QuotaAppConfig,
    #[serde(default)]
    pub governor: GovernorAppConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Directory for persisted state
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .map(|d| d.join("quizforge"))
                .unwrap_or_else(|| PathBuf::from("data")),
        }
    }

    /// Quota state file
    pub fn quota_state_path(&self) -> PathBuf {
        match &self.quota.state_file {
            Some(path) => PathBuf::from(path),
            None => self.data_dir().join("quota_state.json"),
        }
    }

    /// Quota ceilings for the tracker
    pub fn quota_config(&self) -> QuotaConfig {
        QuotaConfig {
            minute_quota: self.quota.minute_quota,
            daily_quota: self.quota.daily_quota,
            history_days: self.quota.history_days,
        }
    }

    /// Pacing policy for the governor
    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig::default()
            .with_min_interval(Duration::from_secs(self.governor.min_interval_secs))
            .with_post_success_pause(Duration::from_millis(self.governor.post_success_pause_ms))
            .with_default_retry_delay(Duration::from_secs(
                self.governor.default_retry_delay_secs,
            ))
            .with_max_retries(self.governor.max_retries)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaAppConfig {
    #[serde(default = "default_minute_quota")]
    pub minute_quota: u32,
    #[serde(default = "default_daily_quota")]
    pub daily_quota: u32,
    #[serde(default = "default_history_days")]
    pub history_days: usize,
    /// Override for the state file location
    #[serde(default)]
    pub state_file: Option<String>,
}

impl Default for QuotaAppConfig {
    fn default() -> Self {
        Self {
            minute_quota: default_minute_quota(),
            daily_quota: default_daily_quota(),
            history_days: default_history_days(),
            state_file: None,
        }
    }
}

fn default_minute_quota() -> u32 {
    15
}
fn default_daily_quota() -> u32 {
    120
}
fn default_history_days() -> usize {
    30
}

/// Request governor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorAppConfig {
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_post_success_pause_ms")]
    pub post_success_pause_ms: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub default_retry_delay_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GovernorAppConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            post_success_pause_ms: default_post_success_pause_ms(),
            default_retry_delay_secs: default_retry_delay_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_min_interval_secs() -> u64 {
    30
}
fn default_post_success_pause_ms() -> u64 {
    1000
}
fn default_retry_delay_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini" or "mock"
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_timeout_secs() -> u64 {
    60
}

/// Document upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}
