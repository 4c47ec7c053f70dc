//! Quota state persistence

use super::QuotaState;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Storage failure. Never surfaced past the quota tracker.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored state could not be decoded or encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value slot holding one [`QuotaState`].
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Load the stored state, `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<QuotaState>, PersistenceError>;

    /// Replace the stored state.
    async fn save(&self, state: &QuotaState) -> Result<(), PersistenceError>;
}

// ============================================================================
// MemoryQuotaStore
// ============================================================================

/// In-memory store, used by tests and when persistence is disabled.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    state: Mutex<Option<QuotaState>>,
    saves: AtomicUsize,
}

impl MemoryQuotaStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `state`
    #[must_use]
    pub fn with_state(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Currently stored state
    pub fn snapshot(&self) -> Option<QuotaState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn load(&self) -> Result<Option<QuotaState>, PersistenceError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &QuotaState) -> Result<(), PersistenceError> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// FileQuotaStore
// ============================================================================

/// JSON file store. Writes go to a sibling temp file and are renamed into
/// place so a crash never leaves a half-written state file.
#[derive(Debug, Clone)]
pub struct FileQuotaStore {
    path: PathBuf,
}

impl FileQuotaStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `quota_state.json` inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join("quota_state.json"))
    }

    /// Backing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl QuotaStore for FileQuotaStore {
    async fn load(&self) -> Result<Option<QuotaState>, PersistenceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let state = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    async fn save(&self, state: &QuotaState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Quota state saved");
        Ok(())
    }
}
