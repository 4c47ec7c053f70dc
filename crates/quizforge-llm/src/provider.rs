//! LLM Provider trait definition

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;

/// Trait for generative AI backends
///
/// Implementations must report throttling as [`crate::Error::RateLimit`] so
/// callers can tell it apart from permanent failures.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a single prompt
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
