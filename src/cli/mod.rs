//! CLI module for Quizforge
//!
//! Provides commands:
//! - `serve`: Run the HTTP server (default)
//! - `quota`: Show quota usage from the persisted state file
//! - `doctor`: Configuration and environment diagnostics

use clap::{Parser, Subcommand};

pub mod doctor;
pub mod quota;

/// Quizforge CLI
#[derive(Parser, Debug)]
#[command(name = "quizforge")]
#[command(about = "AI quiz generation service with quota-aware request pacing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Show quota usage
    Quota {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Refresh every 2 seconds
        #[arg(long, conflicts_with = "json")]
        watch: bool,
    },
    /// Run configuration diagnostics
    Doctor,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Quota { json, watch }) => quota::run(json, watch).await,
        Some(Commands::Doctor) => doctor::run().await,
        Some(Commands::Serve) | None => crate::server::run().await,
    }
}
