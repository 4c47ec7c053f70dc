//! Quiz domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Smallest quiz that can be requested
pub const MIN_QUESTIONS: u32 = 1;
/// Largest quiz that can be requested
pub const MAX_QUESTIONS: u32 = 20;

/// Kind of question a quiz is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Pick one of several options
    MultipleChoice,
    /// True or false statement
    TrueFalse,
    /// Free-form answer, graded by the AI backend
    OpenEnded,
}

impl QuestionType {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::OpenEnded => "open_ended",
        }
    }

    /// Whether answers can be graded without calling the backend
    #[must_use]
    pub fn is_locally_graded(&self) -> bool {
        !matches!(self, Self::OpenEnded)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "multiple_choice" | "mcq" => Ok(Self::MultipleChoice),
            "true_false" | "tf" => Ok(Self::TrueFalse),
            "open_ended" | "open" => Ok(Self::OpenEnded),
            other => Err(format!("unknown question type: {}", other)),
        }
    }
}

/// Where the study material comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizSource {
    /// A typed topic or free text
    Topic {
        /// Topic text
        topic: String,
    },
    /// Text extracted from an uploaded document
    Document {
        /// Original file name
        file_name: String,
        /// Extracted text
        text: String,
    },
}

impl QuizSource {
    /// Material handed to the backend
    #[must_use]
    pub fn material(&self) -> &str {
        match self {
            Self::Topic { topic } => topic,
            Self::Document { text, .. } => text,
        }
    }

    /// Short human-readable label for listings
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Topic { topic } => {
                let topic = topic.trim();
                if topic.chars().count() > 60 {
                    format!("{}...", topic.chars().take(57).collect::<String>())
                } else {
                    topic.to_string()
                }
            }
            Self::Document { file_name, .. } => file_name.clone(),
        }
    }
}

/// A request to generate a quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    /// Study material
    pub source: QuizSource,
    /// Question kind
    pub question_type: QuestionType,
    /// Number of questions
    pub count: u32,
}

impl QuizRequest {
    /// Quiz on a typed topic
    pub fn topic(topic: impl Into<String>, question_type: QuestionType, count: u32) -> Self {
        Self {
            source: QuizSource::Topic {
                topic: topic.into(),
            },
            question_type,
            count,
        }
    }

    /// Quiz on an uploaded document's text
    pub fn document(
        file_name: impl Into<String>,
        text: impl Into<String>,
        question_type: QuestionType,
        count: u32,
    ) -> Self {
        Self {
            source: QuizSource::Document {
                file_name: file_name.into(),
                text: text.into(),
            },
            question_type,
            count,
        }
    }
}

/// One generated question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question text
    pub question: String,
    /// Choices (multiple choice only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Reference answer
    pub answer: String,
    /// Why the answer is right
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// What the backend produced for a quiz request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizOutcome {
    /// Output matched the expected structure
    Structured {
        /// Parsed questions
        questions: Vec<Question>,
    },
    /// Output could not be parsed; kept verbatim
    Unstructured {
        /// Raw backend text
        raw: String,
    },
}

impl QuizOutcome {
    /// Structured questions, if any
    #[must_use]
    pub fn questions(&self) -> Option<&[Question]> {
        match self {
            Self::Structured { questions } => Some(questions),
            Self::Unstructured { .. } => None,
        }
    }
}

/// Grading result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Answer accepted
    Correct,
    /// Answer rejected
    Incorrect,
    /// Grader could not decide
    Ungraded,
}

/// Who graded an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradedBy {
    /// Compared against the reference answer in-process
    Local,
    /// Judged by the AI backend
    Ai,
}

/// Answer submitted for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// Zero-based question index
    pub question_index: usize,
    /// User's answer
    pub answer: String,
}

/// Outcome of grading one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    /// Verdict
    pub verdict: Verdict,
    /// Reference answer, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Feedback for the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Grader
    pub graded_by: GradedBy,
}

/// Graded answer kept on the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Zero-based question index
    pub question_index: usize,
    /// User's answer
    pub answer: String,
    /// Grading result
    pub grade: Grade,
    /// When the answer was graded
    pub answered_at: DateTime<Utc>,
}

/// A generated quiz and the answers given so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    /// Session id
    pub id: Uuid,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Material label
    pub source_label: String,
    /// Question kind
    pub question_type: QuestionType,
    /// Questions requested
    pub requested_count: u32,
    /// Generated content
    pub outcome: QuizOutcome,
    /// Graded answers, oldest first
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

impl QuizSession {
    /// New session created now
    #[must_use]
    pub fn new(request: &QuizRequest, outcome: QuizOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source_label: request.source.label(),
            question_type: request.question_type,
            requested_count: request.count,
            outcome,
            answers: Vec::new(),
        }
    }

    /// Number of answers graded correct
    #[must_use]
    pub fn score(&self) -> usize {
        self.answers
            .iter()
            .filter(|a| a.grade.verdict == Verdict::Correct)
            .count()
    }
}
