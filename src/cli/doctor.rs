//! CLI command: `quizforge doctor`
//!
//! Checks configuration, the quota state file and LLM credentials.

use crate::server::config::AppConfig;
use crate::server::{load_config, validate_config};
use quizforge_core::{FileQuotaStore, QuotaStore};
use quizforge_llm::util::mask_api_key;
use std::path::Path;

pub async fn run() -> anyhow::Result<()> {
    println!("Quizforge Doctor\n");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            println!("Checking configuration... FAILED");
            println!("  {:#}", e);
            std::process::exit(1);
        }
    };

    let mut all_ok = true;
    all_ok &= check_config(&config);
    all_ok &= check_quota_state(&config).await;
    all_ok &= check_llm(&config);

    println!();
    if all_ok {
        println!("All checks passed. Ready to run Quizforge.");
    } else {
        println!("Some checks failed. Please fix the issues above.");
        std::process::exit(1);
    }

    Ok(())
}

fn check_config(config: &AppConfig) -> bool {
    print!("Checking configuration... ");
    match validate_config(config) {
        Ok(()) => {
            println!("ok");
            println!(
                "  quota: {}/min, {}/day; governor: one call every {}s, {} retries",
                config.quota.minute_quota,
                config.quota.daily_quota,
                config.governor.min_interval_secs,
                config.governor.max_retries
            );
            true
        }
        Err(e) => {
            println!("FAILED");
            println!("  {}", e);
            false
        }
    }
}

async fn check_quota_state(config: &AppConfig) -> bool {
    let path = config.quota_state_path();
    print!("Checking quota state... ");

    let store = FileQuotaStore::new(path.clone());
    match store.load().await {
        Ok(Some(state)) => {
            println!("ok ({})", path.display());
            println!(
                "  {} requests on {}, {} days of history",
                state.requests_today,
                state.day_key,
                state.history.len()
            );
            true
        }
        Ok(None) => {
            println!("will create {}", path.display());
            dir_writable(path.parent())
        }
        Err(e) => {
            // The server falls back to fresh counters in this case.
            println!("unreadable ({})", e);
            println!("  The file will be replaced on the next recorded call");
            true
        }
    }
}

fn dir_writable(dir: Option<&Path>) -> bool {
    let Some(dir) = dir else {
        return true;
    };
    if !dir.exists() {
        return true;
    }
    match std::fs::metadata(dir) {
        Ok(meta) if meta.permissions().readonly() => {
            println!("  {} is read-only", dir.display());
            false
        }
        Ok(_) => true,
        Err(e) => {
            println!("  cannot inspect {}: {}", dir.display(), e);
            false
        }
    }
}

fn check_llm(config: &AppConfig) -> bool {
    print!("Checking LLM provider... ");
    match config.llm.provider.as_str() {
        "mock" => {
            println!("mock (canned responses)");
            true
        }
        "gemini" => {
            let key = std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("GOOGLE_API_KEY"));
            match key {
                Ok(key) if !key.trim().is_empty() => {
                    println!("gemini, key {}", mask_api_key(&key));
                    true
                }
                _ => {
                    println!("FAILED");
                    println!("  Set GEMINI_API_KEY (or GOOGLE_API_KEY) in the environment or .env");
                    false
                }
            }
        }
        other => {
            println!("FAILED");
            println!("  Unknown provider '{}'", other);
            false
        }
    }
}
