//! LLM provider resolution

use super::config::LlmConfig;
use anyhow::{bail, Context, Result};
use quizforge_llm::{GeminiConfig, GeminiProvider, LlmProvider, MockProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Canned quiz returned by the mock provider
const MOCK_QUIZ: &str = r#"{"questions":[{"question":"Quizforge is running with the mock provider.","answer":"true","explanation":"Set llm.provider = \"gemini\" and GEMINI_API_KEY for real quizzes."}]}"#;

/// Build the configured LLM provider
pub fn resolve_llm_provider(llm_config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match llm_config.provider.as_str() {
        "gemini" => {
            let mut config = GeminiConfig::from_env()
                .context("Gemini provider selected but no API key found")?
                .with_max_tokens(llm_config.max_output_tokens)
                .with_timeout(Duration::from_secs(llm_config.timeout_secs));
            if let Some(model) = &llm_config.model {
                config = config.with_model(model);
            }

            let provider = GeminiProvider::new(config).context("Failed to create Gemini provider")?;
            info!(model = provider.default_model(), "Registered Gemini provider");
            Ok(Arc::new(provider))
        }
        "mock" => {
            warn!("Using mock LLM provider");
            Ok(Arc::new(MockProvider::new().with_fallback(MOCK_QUIZ)))
        }
        other => bail!("Unknown LLM provider: {}", other),
    }
}
