//! Quiz workflow
//!
//! Every path that may reach the AI backend goes through the same steps:
//! quota admission check, usage record, governed dispatch. Locally graded
//! answers stop after the admission check.

use super::parse::{grade_locally, parse_grade, parse_quiz};
use super::prompt::{grading_prompt, quiz_prompt};
use super::types::{
    AnswerRecord, AnswerSubmission, Grade, GradedBy, QuizOutcome, QuizRequest, QuizSession,
    Verdict, MAX_QUESTIONS, MIN_QUESTIONS,
};
use crate::error::{Error, Result};
use crate::governor::RequestGovernor;
use crate::quota::QuotaTracker;
use crate::session::SessionStore;
use chrono::Utc;
use quizforge_llm::util::truncate_safe;
use quizforge_llm::{CompletionRequest, CompletionResponse, LlmProvider};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Tunables for backend calls
#[derive(Debug, Clone)]
pub struct QuizOptions {
    /// Model override; empty means the provider default
    pub model: String,
    /// Output token budget for quiz generation
    pub max_output_tokens: u32,
    /// Output token budget for grading
    pub grading_max_tokens: u32,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_output_tokens: 8192,
            grading_max_tokens: 1024,
        }
    }
}

/// Quiz generation and grading on top of the quota tracker and governor.
pub struct QuizService {
    quota: Arc<QuotaTracker>,
    governor: Arc<RequestGovernor<CompletionResponse>>,
    provider: Arc<dyn LlmProvider>,
    sessions: Arc<dyn SessionStore>,
    options: QuizOptions,
}

impl QuizService {
    /// Create a new service
    pub fn new(
        quota: Arc<QuotaTracker>,
        governor: Arc<RequestGovernor<CompletionResponse>>,
        provider: Arc<dyn LlmProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            quota,
            governor,
            provider,
            sessions,
            options: QuizOptions::default(),
        }
    }

    /// Replace the backend call options
    #[must_use]
    pub fn with_options(mut self, options: QuizOptions) -> Self {
        self.options = options;
        self
    }

    /// Quota tracker in use
    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    /// Governor in use
    pub fn governor(&self) -> &Arc<RequestGovernor<CompletionResponse>> {
        &self.governor
    }

    /// Session store in use
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Generate a quiz and store it as a new session.
    #[instrument(skip(self, request), fields(question_type = %request.question_type, count = request.count))]
    pub async fn generate_quiz(&self, request: QuizRequest) -> Result<QuizSession> {
        validate_request(&request)?;
        self.admit().await?;

        let prompt = quiz_prompt(&request, self.options.max_output_tokens);
        let response = self.call_backend(prompt).await?;

        let outcome = match parse_quiz(&response.content, request.question_type) {
            Some(questions) => {
                if questions.len() != request.count as usize {
                    debug!(
                        requested = request.count,
                        received = questions.len(),
                        "Backend returned a different number of questions"
                    );
                }
                QuizOutcome::Structured { questions }
            }
            None => {
                warn!("Backend output did not match the quiz format, keeping raw text");
                QuizOutcome::Unstructured {
                    raw: response.content,
                }
            }
        };

        let session = QuizSession::new(&request, outcome);
        self.sessions.insert(session.clone()).await?;
        info!(session_id = %session.id, "Quiz session created");
        Ok(session)
    }

    /// Grade one answer and record it on the session.
    #[instrument(skip(self, submission), fields(question_index = submission.question_index))]
    pub async fn validate_answer(
        &self,
        session_id: Uuid,
        submission: AnswerSubmission,
    ) -> Result<AnswerRecord> {
        self.admit().await?;

        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        let questions = session.outcome.questions().ok_or_else(|| {
            Error::InvalidInput("this quiz has no structured questions to answer".to_string())
        })?;
        let question = questions.get(submission.question_index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "question index {} out of range (quiz has {} questions)",
                submission.question_index,
                questions.len()
            ))
        })?;
        if submission.answer.trim().is_empty() {
            return Err(Error::InvalidInput("answer must not be empty".to_string()));
        }

        let grade = match grade_locally(question, session.question_type, &submission.answer) {
            Some(correct) => Grade {
                verdict: if correct {
                    Verdict::Correct
                } else {
                    Verdict::Incorrect
                },
                correct_answer: Some(question.answer.clone()),
                feedback: question.explanation.clone(),
                graded_by: GradedBy::Local,
            },
            None => {
                let prompt = grading_prompt(
                    question,
                    &submission.answer,
                    self.options.grading_max_tokens,
                );
                let response = self.call_backend(prompt).await?;
                ai_grade(&response.content, &question.answer)
            }
        };

        let record = AnswerRecord {
            question_index: submission.question_index,
            answer: submission.answer,
            grade,
            answered_at: Utc::now(),
        };
        self.sessions
            .record_answer(session_id, record.clone())
            .await?;
        Ok(record)
    }

    /// Refuse the request when the quota pre-check says so.
    async fn admit(&self) -> Result<()> {
        let status = self.quota.check().await;
        if status.is_quota_exceeded {
            let retry_after_secs = status.retry_after_secs();
            warn!(retry_after_secs, "Admission denied by quota check");
            return Err(Error::AdmissionDenied { retry_after_secs });
        }
        Ok(())
    }

    /// Record usage and dispatch through the governor.
    async fn call_backend(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let recorded = self.quota.record().await;
        if recorded.is_quota_exceeded {
            // The call is already counted; it still goes out.
            warn!(
                requests_this_minute = recorded.state.requests_this_minute,
                requests_today = recorded.state.requests_today,
                "Quota exceeded by this call, dispatching anyway"
            );
        }

        let request = if self.options.model.is_empty() {
            request
        } else {
            request.with_model(self.options.model.clone())
        };

        let provider = Arc::clone(&self.provider);
        self.governor
            .submit(move || {
                let provider = Arc::clone(&provider);
                let request = request.clone();
                async move { provider.complete(request).await }
            })
            .await
    }
}

fn validate_request(request: &QuizRequest) -> Result<()> {
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&request.count) {
        return Err(Error::InvalidInput(format!(
            "question count must be between {} and {}",
            MIN_QUESTIONS, MAX_QUESTIONS
        )));
    }
    if request.source.material().trim().is_empty() {
        return Err(Error::InvalidInput(
            "study material must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn ai_grade(raw: &str, reference: &str) -> Grade {
    match parse_grade(raw) {
        Some(grade) => Grade {
            verdict: if grade.correct {
                Verdict::Correct
            } else {
                Verdict::Incorrect
            },
            correct_answer: Some(reference.to_string()),
            feedback: grade.feedback,
            graded_by: GradedBy::Ai,
        },
        None => {
            warn!("Grader output did not match the expected format");
            let feedback = raw.trim();
            Grade {
                verdict: Verdict::Ungraded,
                correct_answer: Some(reference.to_string()),
                feedback: (!feedback.is_empty())
                    .then(|| truncate_safe(feedback, 2_000).to_string()),
                graded_by: GradedBy::Ai,
            }
        }
    }
}
