//! Server module for Quizforge
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `providers`: LLM provider resolution
//! - `validation`: Startup and production configuration validation
//! - `init`: Main server initialization and run loop

pub mod config;
mod init;
mod loader;
mod providers;
mod validation;

// Re-export public API
pub use init::run;
pub use loader::load_config;
pub use validation::validate_config;
