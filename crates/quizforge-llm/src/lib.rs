//! Quizforge LLM - Generative AI Backend Abstraction
//!
//! This crate provides the outbound AI call for Quizforge:
//! - Provider: the `LlmProvider` trait every backend implements
//! - Gemini: Google Gemini provider (reqwest)
//! - Mock: scripted provider for tests and offline runs
//! - Error: failure taxonomy, with rate limiting kept distinct from
//!   permanent backend failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::MockProvider;
pub use provider::LlmProvider;
