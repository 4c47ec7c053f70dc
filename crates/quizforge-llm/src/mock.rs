//! Mock LLM Provider for testing and offline runs
//!
//! Returns queued outcomes in order, falling back to a fixed reply once the
//! queue is empty. Every prompt it sees is kept for inspection.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MOCK_MODEL: &str = "mock-model";

/// A mock LLM provider that returns scripted outcomes.
#[derive(Clone)]
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<Result<CompletionResponse>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    fallback: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            fallback: "mock response".to_string(),
        }
    }

    /// Reply used when no scripted outcome is queued.
    #[must_use]
    pub fn with_fallback(mut self, content: impl Into<String>) -> Self {
        self.fallback = content.into();
        self
    }

    /// Queue a successful text response.
    pub fn push_text(&self, content: impl Into<String>) {
        self.push_outcome(Ok(CompletionResponse::text(content, MOCK_MODEL)));
    }

    /// Queue an arbitrary outcome (use this to script failures).
    pub fn push_outcome(&self, outcome: Result<CompletionResponse>) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Prompts received so far, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        MOCK_MODEL
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.prompt);

        let next = self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        next.unwrap_or_else(|| Ok(CompletionResponse::text(self.fallback.clone(), MOCK_MODEL)))
    }
}
