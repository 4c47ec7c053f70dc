//! CLI command: `quizforge quota`
//!
//! Displays minute and daily usage from the persisted quota state, the time
//! until the minute window resets, and recent daily history.

use crate::server::load_config;
use quizforge_core::{FileQuotaStore, QuotaSnapshot, QuotaTracker};
use std::sync::Arc;

/// Days of history shown in the table
const HISTORY_ROWS: usize = 7;

/// Run the quota subcommand.
pub async fn run(json: bool, watch: bool) -> anyhow::Result<()> {
    if watch {
        run_watch().await
    } else if json {
        run_json().await
    } else {
        run_table().await
    }
}

async fn load_snapshot() -> anyhow::Result<QuotaSnapshot> {
    let config = load_config()?;
    let tracker = QuotaTracker::new(
        config.quota_config(),
        Arc::new(FileQuotaStore::new(config.quota_state_path())),
    );
    Ok(tracker.status().await)
}

/// Pretty-printed table output.
async fn run_table() -> anyhow::Result<()> {
    let snapshot = load_snapshot().await?;
    print!("{}", render_table(&snapshot));
    Ok(())
}

fn render_table(snapshot: &QuotaSnapshot) -> String {
    let mut out = String::new();
    let rule = format!("  {}\n", "-".repeat(56));

    out.push('\n');
    out.push_str(&format!("  Quota ({})\n", snapshot.day_key));
    out.push_str(&rule);
    out.push_str(&format!(
        "  {:<14} {}\n",
        "This minute",
        format_ratio(snapshot.requests_this_minute, snapshot.minute_quota)
    ));
    out.push_str(&format!(
        "  {:<14} {}\n",
        "Today",
        format_ratio(snapshot.requests_today, snapshot.daily_quota)
    ));
    out.push_str(&format!(
        "  {:<14} {}\n",
        "Status",
        if snapshot.is_quota_exceeded {
            format!("EXCEEDED, resets in {}", format_millis(snapshot.time_to_reset_ms))
        } else {
            "ok".to_string()
        }
    ));
    if snapshot.quota_exceeded_count > 0 {
        out.push_str(&format!(
            "  {:<14} {}\n",
            "Exceeded",
            format_number_with_commas(u64::from(snapshot.quota_exceeded_count))
        ));
    }

    if !snapshot.history.is_empty() {
        out.push_str(&rule);
        out.push_str(&format!("  {:<14} {:<12} Exceeded\n", "Date", "Requests"));
        for day in snapshot.history.iter().rev().take(HISTORY_ROWS) {
            out.push_str(&format!(
                "  {:<14} {:<12} {}\n",
                day.date.to_string(),
                format_number_with_commas(u64::from(day.requests)),
                day.quota_exceeds
            ));
        }
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

/// JSON output for scripting.
async fn run_json() -> anyhow::Result<()> {
    let snapshot = load_snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Watch mode: refresh display every 2 seconds.
async fn run_watch() -> anyhow::Result<()> {
    loop {
        // Clear screen
        print!("\x1b[2J\x1b[H");
        run_table().await?;
        println!("  (refreshing every 2s, Ctrl+C to exit)");
        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
    }
}

// ── helpers ──────────────────────────────────────────────────────────────

fn format_ratio(used: u32, limit: u32) -> String {
    let pct = if limit > 0 {
        (f64::from(used) / f64::from(limit) * 100.0) as u64
    } else {
        0
    };
    format!(
        "{} / {} ({}%)",
        format_number_with_commas(u64::from(used)),
        format_number_with_commas(u64::from(limit)),
        pct
    )
}

fn format_millis(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
