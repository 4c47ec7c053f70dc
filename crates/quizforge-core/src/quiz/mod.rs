//! Quiz generation and grading
//!
//! - `types`: requests, questions, sessions, grades
//! - `prompt`: backend prompts
//! - `parse`: structured-output parsing and local grading
//! - `service`: the calling workflow (`QuizService`)

pub mod parse;
pub mod prompt;
mod service;
mod types;

pub use service::{QuizOptions, QuizService};
pub use types::{
    AnswerRecord, AnswerSubmission, Grade, GradedBy, Question, QuestionType, QuizOutcome,
    QuizRequest, QuizSession, QuizSource, Verdict, MAX_QUESTIONS, MIN_QUESTIONS,
};

#[cfg(test)]
mod tests;
