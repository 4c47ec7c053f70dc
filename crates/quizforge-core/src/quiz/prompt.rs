//! Prompt construction
//!
//! The wording is not load-bearing; only the requested JSON shape is, since
//! [`super::parse`] expects it back.

use super::types::{QuestionType, Question, QuizRequest};
use quizforge_llm::util::truncate_safe;
use quizforge_llm::CompletionRequest;

/// Longest material sent to the backend, in bytes
pub const MAX_MATERIAL_BYTES: usize = 30_000;

const QUIZ_SYSTEM: &str = "You are a precise quiz author. You write questions that test \
understanding of the provided material and reply with JSON only.";

const GRADER_SYSTEM: &str = "You are a fair examiner. You judge whether a student's answer \
is correct and reply with JSON only.";

fn shape_for(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => {
            r#"{"questions":[{"question":"...","options":["A","B","C","D"],"answer":"<exact text of the correct option>","explanation":"..."}]}"#
        }
        QuestionType::TrueFalse => {
            r#"{"questions":[{"question":"<a statement>","answer":"true|false","explanation":"..."}]}"#
        }
        QuestionType::OpenEnded => {
            r#"{"questions":[{"question":"...","answer":"<model answer>","explanation":"..."}]}"#
        }
    }
}

/// Prompt asking for a quiz on the request's material.
pub fn quiz_prompt(request: &QuizRequest, max_tokens: u32) -> CompletionRequest {
    let material = truncate_safe(request.source.material().trim(), MAX_MATERIAL_BYTES);
    let prompt = format!(
        "Write {count} {kind} questions about the material below.\n\
         Respond with a single JSON object of this shape:\n{shape}\n\n\
         Material:\n\"\"\"\n{material}\n\"\"\"",
        count = request.count,
        kind = request.question_type.as_str().replace('_', " "),
        shape = shape_for(request.question_type),
        material = material,
    );

    CompletionRequest::new(prompt)
        .with_system(QUIZ_SYSTEM)
        .with_max_tokens(max_tokens)
        .with_temperature(0.7)
        .with_json_output()
}

/// Prompt asking the backend to grade a free-form answer.
pub fn grading_prompt(question: &Question, answer: &str, max_tokens: u32) -> CompletionRequest {
    let prompt = format!(
        "Question: {question}\n\
         Reference answer: {reference}\n\
         Student answer: {answer}\n\n\
         Respond with a single JSON object: {{\"correct\": true|false, \"feedback\": \"...\"}}",
        question = question.question,
        reference = question.answer,
        answer = truncate_safe(answer.trim(), 4_000),
    );

    CompletionRequest::new(prompt)
        .with_system(GRADER_SYSTEM)
        .with_max_tokens(max_tokens)
        .with_temperature(0.0)
        .with_json_output()
}
