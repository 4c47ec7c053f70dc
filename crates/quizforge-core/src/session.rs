//! Quiz session storage
//!
//! Sessions hold a generated quiz and the answers graded against it.

use crate::error::{Error, Result};
use crate::quiz::{AnswerRecord, QuestionType, QuizSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Listing view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Session id
    pub id: Uuid,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Material label
    pub source_label: String,
    /// Question kind
    pub question_type: QuestionType,
    /// Structured questions generated (0 for unstructured output)
    pub question_count: usize,
    /// Answers graded so far
    pub answered: usize,
    /// Answers graded correct
    pub score: usize,
}

impl From<&QuizSession> for SessionSummary {
    fn from(session: &QuizSession) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            source_label: session.source_label.clone(),
            question_type: session.question_type,
            question_count: session.outcome.questions().map_or(0, <[_]>::len),
            answered: session.answers.len(),
            score: session.score(),
        }
    }
}

/// Session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session
    async fn insert(&self, session: QuizSession) -> Result<()>;

    /// Fetch a session
    async fn get(&self, id: Uuid) -> Result<Option<QuizSession>>;

    /// Newest sessions first
    async fn list(&self, limit: usize) -> Result<Vec<SessionSummary>>;

    /// Remove a session, returning whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Append a graded answer and return the updated session
    async fn record_answer(&self, id: Uuid, answer: AnswerRecord) -> Result<QuizSession>;
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, QuizSession>>,
}

impl MemorySessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: QuizSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(Error::Internal(format!(
                "session {} already exists",
                session.id
            )));
        }
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<QuizSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<&QuizSession> = sessions.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .take(limit)
            .map(SessionSummary::from)
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    async fn record_answer(&self, id: Uuid, answer: AnswerRecord) -> Result<QuizSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        session.answers.push(answer);
        Ok(session.clone())
    }
}
