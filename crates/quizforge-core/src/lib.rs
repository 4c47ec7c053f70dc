//! Quizforge Core - Admission, Pacing and Quiz Workflow
//!
//! This crate provides the core of Quizforge:
//! - Quota: per-minute and per-day usage accounting with a persisted state
//! - Governor: single-worker queue that paces and retries outbound AI calls
//! - Quiz: generation and grading workflow built on the two above
//! - Session: storage for generated quizzes and graded answers
//! - Document: text extraction for uploaded study material

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod document;
pub mod error;
pub mod governor;
pub mod quiz;
pub mod quota;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{extract_text, DocumentKind};
pub use error::{Error, Result};
pub use governor::{GovernorConfig, GovernorStats, RequestGovernor};
pub use quiz::{
    AnswerRecord, AnswerSubmission, Grade, GradedBy, Question, QuestionType, QuizOptions,
    QuizOutcome, QuizRequest, QuizService, QuizSession, QuizSource, Verdict,
};
pub use quota::{
    DailyUsage, FileQuotaStore, MemoryQuotaStore, PersistenceError, QuotaConfig, QuotaSnapshot,
    QuotaState, QuotaStatus, QuotaStore, QuotaTracker,
};
pub use session::{MemorySessionStore, SessionStore, SessionSummary};
