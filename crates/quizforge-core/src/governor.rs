//! Request Governor
//!
//! Serializes outbound AI calls through a single worker task:
//! - at most one call in flight
//! - a minimum spacing between consecutive dispatches
//! - rate-limited calls are re-queued with exponential backoff, other
//!   failures are reported immediately
//!
//! Retry delays run on their own timer tasks so the worker keeps serving
//! the rest of the queue while an item waits out its backoff.

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// Config
// ============================================================================

/// Pacing and retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Minimum time between the starts of two dispatches
    pub min_interval: Duration,
    /// Pause after a successful call before the next dispatch
    pub post_success_pause: Duration,
    /// Backoff base when the backend gives no hint
    pub default_retry_delay: Duration,
    /// Retries allowed per item (first attempt not counted)
    pub max_retries: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(30),
            post_success_pause: Duration::from_secs(1),
            default_retry_delay: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

impl GovernorConfig {
    /// Set the dispatch spacing
    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the post-success pause
    #[must_use]
    pub fn with_post_success_pause(mut self, pause: Duration) -> Self {
        self.post_success_pause = pause;
        self
    }

    /// Set the fallback backoff base
    #[must_use]
    pub fn with_default_retry_delay(mut self, delay: Duration) -> Self {
        self.default_retry_delay = delay;
        self
    }

    /// Set the retry budget
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Delay before retry number `retry_count + 1`:
    /// `(suggested or default) * 2^retry_count`.
    #[must_use]
    pub fn backoff_delay(&self, suggested: Option<Duration>, retry_count: u32) -> Duration {
        let base = suggested.unwrap_or(self.default_retry_delay);
        base.saturating_mul(2u32.saturating_pow(retry_count))
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Point-in-time governor counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GovernorStats {
    /// Items waiting in the queue
    pub queued: u64,
    /// Items sleeping out a retry delay
    pub pending_retries: u64,
    /// Total dispatches, retries included
    pub dispatched: u64,
    /// Items that completed successfully
    pub succeeded: u64,
    /// Retries scheduled
    pub retried: u64,
    /// Items failed with a non-retryable error
    pub failed: u64,
    /// Items that ran out of retries
    pub exhausted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    pending_retries: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    exhausted: AtomicU64,
}

impl Counters {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn decr(counter: &AtomicU64) {
        let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    fn snapshot(&self) -> GovernorStats {
        GovernorStats {
            queued: self.queued.load(Ordering::Relaxed),
            pending_retries: self.pending_retries.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// RequestGovernor
// ============================================================================

type Job<T> = Arc<dyn Fn() -> BoxFuture<'static, quizforge_llm::Result<T>> + Send + Sync>;

struct WorkItem<T> {
    id: u64,
    run: Job<T>,
    retry_count: u32,
    reply: oneshot::Sender<Result<T>>,
}

impl<T> WorkItem<T> {
    fn fail_closed(self) {
        let _ = self.reply.send(Err(Error::GovernorClosed));
    }
}

/// Single-worker FIFO that paces and retries outbound AI calls.
///
/// Must be created inside a Tokio runtime.
pub struct RequestGovernor<T> {
    tx: mpsc::UnboundedSender<WorkItem<T>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> RequestGovernor<T> {
    /// Start the worker task.
    pub fn new(config: GovernorConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let cancel = CancellationToken::new();

        let worker = Worker {
            config,
            retry_tx: tx.clone(),
            counters: counters.clone(),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(worker.run(rx));

        Self {
            tx,
            counters,
            cancel,
            worker: Mutex::new(Some(handle)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue `call` and wait for its final outcome.
    ///
    /// `call` may be invoked more than once if the backend rate limits it.
    pub async fn submit<F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = quizforge_llm::Result<T>> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::GovernorClosed);
        }

        let (reply, outcome) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let item = WorkItem {
            id,
            run: Arc::new(move || call().boxed()),
            retry_count: 0,
            reply,
        };

        Counters::incr(&self.counters.queued);
        if let Err(mpsc::error::SendError(item)) = self.tx.send(item) {
            Counters::decr(&self.counters.queued);
            item.fail_closed();
            return Err(Error::GovernorClosed);
        }
        debug!(item_id = id, "AI call queued");

        outcome.await.map_err(|_| Error::GovernorClosed)?
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> GovernorStats {
        self.counters.snapshot()
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the worker. Queued and retry-pending items fail with
    /// [`Error::GovernorClosed`].
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Governor worker ended abnormally");
            }
            info!("Request governor closed");
        }
    }
}

impl<T> Drop for RequestGovernor<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker<T> {
    config: GovernorConfig,
    retry_tx: mpsc::UnboundedSender<WorkItem<T>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> Worker<T> {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<WorkItem<T>>) {
        debug!(
            min_interval_ms = self.config.min_interval.as_millis() as u64,
            max_retries = self.config.max_retries,
            "Governor worker started"
        );
        let mut last_dispatch: Option<Instant> = None;

        loop {
            let item = tokio::select! {
                _ = self.cancel.cancelled() => break,
                item = rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };
            Counters::decr(&self.counters.queued);

            if let Some(last) = last_dispatch {
                let ready_at = last + self.config.min_interval;
                if ready_at > Instant::now() {
                    debug!(
                        wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                        "Spacing next dispatch"
                    );
                }
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        item.fail_closed();
                        break;
                    }
                    _ = tokio::time::sleep_until(ready_at) => {}
                }
            }

            last_dispatch = Some(Instant::now());
            if self.dispatch(item).await {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.post_success_pause) => {}
                }
            }
        }

        rx.close();
        while let Ok(item) = rx.try_recv() {
            Counters::decr(&self.counters.queued);
            item.fail_closed();
        }
        debug!("Governor worker stopped");
    }

    /// Run one attempt. Returns true when the item succeeded.
    async fn dispatch(&self, item: WorkItem<T>) -> bool {
        Counters::incr(&self.counters.dispatched);
        let item_id = item.id;
        let attempt = item.retry_count + 1;
        debug!(item_id, retry_count = item.retry_count, "Dispatching AI call");

        let run = item.run.clone();
        let outcome = match AssertUnwindSafe(async move { run().await })
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_reason(&*payload);
                error!(item_id, attempt, reason, "AI call panicked");
                Counters::incr(&self.counters.failed);
                let _ = item
                    .reply
                    .send(Err(Error::Internal(format!("AI call panicked: {}", reason))));
                return false;
            }
        };

        match outcome {
            Ok(value) => {
                Counters::incr(&self.counters.succeeded);
                let _ = item.reply.send(Ok(value));
                true
            }
            Err(e) if e.is_rate_limit() => {
                if item.retry_count < self.config.max_retries {
                    let delay = self.config.backoff_delay(e.retry_after(), item.retry_count);
                    warn!(
                        item_id,
                        retry_count = item.retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Backend rate limited, scheduling retry"
                    );
                    self.schedule_retry(
                        WorkItem {
                            retry_count: item.retry_count + 1,
                            ..item
                        },
                        delay,
                    );
                } else {
                    warn!(item_id, attempts = attempt, "Backend still rate limited, giving up");
                    Counters::incr(&self.counters.exhausted);
                    let retry_after_secs = e
                        .retry_after()
                        .map(|d| (d.as_millis() as u64).div_ceil(1000));
                    let _ = item.reply.send(Err(Error::RetriesExhausted {
                        attempts: attempt,
                        retry_after_secs,
                        last_error: e,
                    }));
                }
                false
            }
            Err(e) => {
                warn!(item_id, attempt, error = %e, "AI call failed");
                Counters::incr(&self.counters.failed);
                let _ = item.reply.send(Err(Error::Backend(e)));
                false
            }
        }
    }

    fn schedule_retry(&self, item: WorkItem<T>, delay: Duration) {
        Counters::incr(&self.counters.retried);
        Counters::incr(&self.counters.pending_retries);

        let tx = self.retry_tx.clone();
        let counters = self.counters.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => item.fail_closed(),
                _ = tokio::time::sleep(delay) => {
                    Counters::incr(&counters.queued);
                    if let Err(mpsc::error::SendError(item)) = tx.send(item) {
                        Counters::decr(&counters.queued);
                        item.fail_closed();
                    }
                }
            }
            Counters::decr(&counters.pending_retries);
        });
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
