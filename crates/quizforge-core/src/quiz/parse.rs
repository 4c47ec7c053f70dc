//! Backend output parsing and local grading
//!
//! Models wrap JSON in code fences or chatter around it, so parsing looks
//! for the outermost JSON value before decoding. Anything that still does
//! not fit yields `None` and the caller falls back to the raw text.

use super::types::{QuestionType, Question};
use serde::Deserialize;

#[derive(Deserialize)]
struct QuizEnvelope {
    questions: Vec<Question>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuizPayload {
    Envelope(QuizEnvelope),
    Bare(Vec<Question>),
}

/// Verdict from an AI grader
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiGrade {
    /// Whether the answer is correct
    pub correct: bool,
    /// Grader feedback
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Slice out the JSON value embedded in `raw`.
fn json_body(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let start = trimmed.find(['{', '['])?;
    let close = if trimmed[start..].starts_with('{') {
        '}'
    } else {
        ']'
    };
    let end = trimmed.rfind(close)?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Parse a generated quiz. Returns `None` unless every question is usable
/// for `question_type`.
pub fn parse_quiz(raw: &str, question_type: QuestionType) -> Option<Vec<Question>> {
    let body = json_body(raw)?;
    let questions = match serde_json::from_str::<QuizPayload>(body).ok()? {
        QuizPayload::Envelope(envelope) => envelope.questions,
        QuizPayload::Bare(questions) => questions,
    };
    if questions.is_empty() {
        return None;
    }

    questions
        .into_iter()
        .map(|q| normalize(q, question_type))
        .collect()
}

fn normalize(mut question: Question, question_type: QuestionType) -> Option<Question> {
    question.question = question.question.trim().to_string();
    question.answer = question.answer.trim().to_string();
    if question.question.is_empty() || question.answer.is_empty() {
        return None;
    }

    match question_type {
        QuestionType::MultipleChoice => {
            if question.options.len() < 2 {
                return None;
            }
            // Store the option text even when the model answered with a letter.
            let index = option_index(&question.options, &question.answer)?;
            question.answer = question.options[index].clone();
        }
        QuestionType::TrueFalse => {
            question.answer = parse_bool(&question.answer)?.to_string();
            question.options.clear();
        }
        QuestionType::OpenEnded => question.options.clear(),
    }
    Some(question)
}

/// Parse an AI grading reply.
pub fn parse_grade(raw: &str) -> Option<AiGrade> {
    serde_json::from_str(json_body(raw)?).ok()
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!'])
        .to_lowercase()
}

/// Resolve an answer to an option index, by letter ("B", "b)") or by text.
fn option_index(options: &[String], answer: &str) -> Option<usize> {
    let wanted = normalize_text(answer);
    if let Some(index) = options.iter().position(|o| normalize_text(o) == wanted) {
        return Some(index);
    }

    let letter = wanted.trim_end_matches([')', ':']);
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => {
            let index = (c as u8 - b'a') as usize;
            (index < options.len()).then_some(index)
        }
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match normalize_text(s).as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Grade a multiple-choice or true/false answer against the reference.
///
/// Returns `None` for open-ended questions.
pub fn grade_locally(question: &Question, question_type: QuestionType, answer: &str) -> Option<bool> {
    match question_type {
        QuestionType::MultipleChoice => Some(
            option_index(&question.options, answer)
                .zip(option_index(&question.options, &question.answer))
                .is_some_and(|(given, expected)| given == expected),
        ),
        QuestionType::TrueFalse => Some(
            parse_bool(answer)
                .zip(parse_bool(&question.answer))
                .is_some_and(|(given, expected)| given == expected),
        ),
        QuestionType::OpenEnded => None,
    }
}
