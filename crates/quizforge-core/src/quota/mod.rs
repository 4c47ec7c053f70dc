//! Quota Admission & Usage Tracking
//!
//! Keeps per-minute and per-day request counters for the AI backend and
//! answers "may another call be attempted right now?".
//!
//! - The minute window is rolling: it restarts at the instant of the first
//!   call made 60s or more after the previous window opened.
//! - The daily counter rolls over when the local calendar date changes; the
//!   finished day is appended to a bounded history.
//! - State is persisted through a [`QuotaStore`]. Storage failures are
//!   logged and never reach the caller.

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

mod store;

pub use store::{FileQuotaStore, MemoryQuotaStore, PersistenceError, QuotaStore};

/// Length of one accounting window
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

// ============================================================================
// Config
// ============================================================================

/// Configured quota ceilings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Calls allowed per rolling minute
    #[serde(default = "default_minute_quota")]
    pub minute_quota: u32,
    /// Calls allowed per local calendar day
    #[serde(default = "default_daily_quota")]
    pub daily_quota: u32,
    /// Days of usage history to keep
    #[serde(default = "default_history_days")]
    pub history_days: usize,
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

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            minute_quota: default_minute_quota(),
            daily_quota: default_daily_quota(),
            history_days: default_history_days(),
        }
    }
}

impl QuotaConfig {
    /// Reject ceilings that would make every call fail.
    pub fn validate(&self) -> Result<()> {
        if self.minute_quota == 0 {
            return Err(Error::invalid_config(
                "quota.minute_quota",
                "must be greater than 0",
            ));
        }
        if self.daily_quota == 0 {
            return Err(Error::invalid_config(
                "quota.daily_quota",
                "must be greater than 0",
            ));
        }
        if self.history_days == 0 {
            return Err(Error::invalid_config(
                "quota.history_days",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// State
// ============================================================================

/// Usage for one finished day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    /// Local calendar date
    pub date: NaiveDate,
    /// Calls recorded that day
    pub requests: u32,
    /// Calls that exceeded a quota that day
    pub quota_exceeds: u32,
}

/// Persisted quota accounting state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    /// Calls recorded on `day_key`
    pub requests_today: u32,
    /// Calls recorded in the current minute window
    pub requests_this_minute: u32,
    /// When the current minute window opened
    pub minute_window_start: DateTime<Utc>,
    /// Local date the daily counter applies to
    pub day_key: NaiveDate,
    /// Per-minute ceiling
    pub minute_quota: u32,
    /// Per-day ceiling
    pub daily_quota: u32,
    /// Exceedances since the last daily rollover
    pub quota_exceeded_count: u32,
    /// Finished days, oldest first
    #[serde(default)]
    pub history: VecDeque<DailyUsage>,
}

impl QuotaState {
    /// Fresh state with zeroed counters and a window opening at `now`.
    #[must_use]
    pub fn new(config: &QuotaConfig, now: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            requests_today: 0,
            requests_this_minute: 0,
            minute_window_start: now,
            day_key: today,
            minute_quota: config.minute_quota,
            daily_quota: config.daily_quota,
            quota_exceeded_count: 0,
            history: VecDeque::new(),
        }
    }

    /// Time elapsed in the current window, clamped at zero if the clock
    /// moved backwards.
    fn window_elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.minute_window_start)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn window_remaining(&self, now: DateTime<Utc>) -> Duration {
        MINUTE_WINDOW.saturating_sub(self.window_elapsed(now))
    }

    /// Close out the stored day once the calendar moves forward. A date
    /// earlier than `day_key` leaves the counters alone.
    fn roll_day(&mut self, today: NaiveDate, history_days: usize) -> bool {
        if today <= self.day_key {
            return false;
        }
        self.history.push_back(DailyUsage {
            date: self.day_key,
            requests: self.requests_today,
            quota_exceeds: self.quota_exceeded_count,
        });
        while self.history.len() > history_days {
            self.history.pop_front();
        }
        self.requests_today = 0;
        self.quota_exceeded_count = 0;
        self.day_key = today;
        true
    }

    fn roll_minute(&mut self, now: DateTime<Utc>) -> bool {
        if self.window_elapsed(now) < MINUTE_WINDOW {
            return false;
        }
        self.requests_this_minute = 0;
        self.minute_window_start = now;
        true
    }
}

/// Outcome of [`QuotaTracker::record`] or [`QuotaTracker::check`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    /// Whether the quota is (or would be) exceeded
    pub is_quota_exceeded: bool,
    /// State snapshot the decision was made on
    pub state: QuotaState,
    /// Milliseconds until the minute window resets (0 when not exceeded)
    #[serde(rename = "timeToReset")]
    pub time_to_reset_ms: u64,
}

impl QuotaStatus {
    fn new(is_quota_exceeded: bool, state: QuotaState, time_to_reset: Duration) -> Self {
        Self {
            is_quota_exceeded,
            state,
            time_to_reset_ms: time_to_reset.as_millis() as u64,
        }
    }

    /// Time until the minute window resets
    #[must_use]
    pub fn time_to_reset(&self) -> Duration {
        Duration::from_millis(self.time_to_reset_ms)
    }

    /// Whole seconds to wait, rounded up (at least 1 when exceeded).
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.time_to_reset_ms.div_ceil(1000);
        if self.is_quota_exceeded {
            secs.max(1)
        } else {
            secs
        }
    }
}

/// Flattened quota view for status displays
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    /// Calls in the current minute window
    pub requests_this_minute: u32,
    /// Per-minute ceiling
    pub minute_quota: u32,
    /// Calls today
    pub requests_today: u32,
    /// Per-day ceiling
    pub daily_quota: u32,
    /// Milliseconds until the minute window resets
    #[serde(rename = "timeToReset")]
    pub time_to_reset_ms: u64,
    /// Whether a new call would be refused
    pub is_quota_exceeded: bool,
    /// Exceedances today
    pub quota_exceeded_count: u32,
    /// Date the daily counter applies to
    pub day_key: NaiveDate,
    /// Finished days, oldest first
    pub history: Vec<DailyUsage>,
}

impl From<QuotaStatus> for QuotaSnapshot {
    fn from(status: QuotaStatus) -> Self {
        let state = status.state;
        Self {
            requests_this_minute: state.requests_this_minute,
            minute_quota: state.minute_quota,
            requests_today: state.requests_today,
            daily_quota: state.daily_quota,
            time_to_reset_ms: status.time_to_reset_ms,
            is_quota_exceeded: status.is_quota_exceeded,
            quota_exceeded_count: state.quota_exceeded_count,
            day_key: state.day_key,
            history: state.history.into(),
        }
    }
}

// ============================================================================
// QuotaTracker
// ============================================================================

struct Slot {
    state: QuotaState,
    loaded: bool,
}

/// Admission gate and usage recorder for outbound AI calls.
///
/// The in-process copy of the state is authoritative; the store is loaded
/// once (on [`init`](Self::init) or first use) and written after every
/// [`record`](Self::record).
pub struct QuotaTracker {
    config: QuotaConfig,
    store: Arc<dyn QuotaStore>,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot>,
}

impl QuotaTracker {
    /// Create a tracker on the system clock.
    pub fn new(config: QuotaConfig, store: Arc<dyn QuotaStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create a tracker on a custom clock.
    pub fn with_clock(
        config: QuotaConfig,
        store: Arc<dyn QuotaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = QuotaState::new(&config, clock.now(), clock.today());
        Self {
            config,
            store,
            clock,
            slot: Mutex::new(Slot {
                state,
                loaded: false,
            }),
        }
    }

    /// Configured ceilings
    #[must_use]
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Load persisted state. Calling this is optional; every operation
    /// loads lazily.
    pub async fn init(&self) -> QuotaState {
        let mut slot = self.slot.lock().await;
        self.ensure_loaded(&mut slot).await;
        info!(
            requests_today = slot.state.requests_today,
            day = %slot.state.day_key,
            "Quota tracker initialized"
        );
        slot.state.clone()
    }

    /// Record one outbound call and report whether it exceeded a quota.
    ///
    /// The call is counted before the exceed check, so the call that
    /// crosses a ceiling is itself counted.
    pub async fn record(&self) -> QuotaStatus {
        let mut slot = self.slot.lock().await;
        self.ensure_loaded(&mut slot).await;

        let now = self.clock.now();
        let today = self.clock.today();
        let state = &mut slot.state;

        let previous_day = state.day_key;
        if today < previous_day {
            warn!(
                stored_day = %previous_day,
                today = %today,
                "Clock is behind the stored quota day, keeping counters"
            );
        } else if state.roll_day(today, self.config.history_days) {
            info!(
                previous_day = %previous_day,
                today = %today,
                "Daily quota counter rolled over"
            );
        }
        if state.roll_minute(now) {
            debug!("Minute quota window restarted");
        }

        state.requests_this_minute = state.requests_this_minute.saturating_add(1);
        state.requests_today = state.requests_today.saturating_add(1);

        let is_quota_exceeded = state.requests_this_minute > state.minute_quota
            || state.requests_today >= state.daily_quota;

        let time_to_reset = if is_quota_exceeded {
            state.quota_exceeded_count = state.quota_exceeded_count.saturating_add(1);
            let remaining = state.window_remaining(now);
            warn!(
                requests_this_minute = state.requests_this_minute,
                minute_quota = state.minute_quota,
                requests_today = state.requests_today,
                daily_quota = state.daily_quota,
                reset_in_ms = remaining.as_millis() as u64,
                "Quota exceeded"
            );
            remaining
        } else {
            Duration::ZERO
        };

        if let Err(e) = self.store.save(state).await {
            warn!(error = %e, "Failed to persist quota state, continuing in memory");
        }

        QuotaStatus::new(is_quota_exceeded, state.clone(), time_to_reset)
    }

    /// Pre-flight admission check. Never mutates or persists state.
    ///
    /// Uses `>=` against the minute quota, one slot tighter than
    /// [`record`](Self::record), so a call that `record` would flag is
    /// refused up front.
    pub async fn check(&self) -> QuotaStatus {
        let mut slot = self.slot.lock().await;
        self.ensure_loaded(&mut slot).await;

        let now = self.clock.now();
        let state = &slot.state;

        if state.window_elapsed(now) >= MINUTE_WINDOW {
            // The stored counter is stale; report the window as empty
            // without restarting it.
            let mut view = state.clone();
            view.requests_this_minute = 0;
            return QuotaStatus::new(false, view, Duration::ZERO);
        }

        let is_quota_exceeded = state.requests_this_minute >= state.minute_quota;
        let time_to_reset = if is_quota_exceeded {
            state.window_remaining(now)
        } else {
            Duration::ZERO
        };
        QuotaStatus::new(is_quota_exceeded, state.clone(), time_to_reset)
    }

    /// Read-through view of [`check`](Self::check) for status endpoints.
    pub async fn status(&self) -> QuotaSnapshot {
        self.check().await.into()
    }

    /// Finished-day usage, oldest first.
    pub async fn history(&self) -> Vec<DailyUsage> {
        let mut slot = self.slot.lock().await;
        self.ensure_loaded(&mut slot).await;
        slot.state.history.iter().cloned().collect()
    }

    /// Flush the current state to the store.
    pub async fn close(&self) {
        let slot = self.slot.lock().await;
        if !slot.loaded {
            return;
        }
        match self.store.save(&slot.state).await {
            Ok(()) => debug!("Quota state flushed"),
            Err(e) => warn!(error = %e, "Failed to flush quota state on close"),
        }
    }

    async fn ensure_loaded(&self, slot: &mut Slot) {
        if slot.loaded {
            return;
        }
        slot.state = self.load_or_default().await;
        slot.loaded = true;
    }

    async fn load_or_default(&self) -> QuotaState {
        let fresh = || QuotaState::new(&self.config, self.clock.now(), self.clock.today());

        match self.store.load().await {
            Ok(Some(mut state)) => {
                // Configured ceilings win over whatever was persisted.
                state.minute_quota = self.config.minute_quota;
                state.daily_quota = self.config.daily_quota;
                while state.history.len() > self.config.history_days {
                    state.history.pop_front();
                }
                debug!(day = %state.day_key, "Loaded persisted quota state");
                state
            }
            Ok(None) => {
                debug!("No persisted quota state, starting fresh");
                fresh()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load quota state, starting fresh");
                fresh()
            }
        }
    }
}
