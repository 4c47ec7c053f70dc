use super::parse::{grade_locally, parse_grade, parse_quiz};
use super::*;
use crate::error::Error;
use crate::governor::{GovernorConfig, RequestGovernor};
use crate::quota::{MemoryQuotaStore, QuotaConfig, QuotaTracker};
use crate::session::{MemorySessionStore, SessionStore};
use quizforge_llm::MockProvider;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MC_QUIZ: &str = r#"```json
{"questions":[
  {"question":"Which keyword declares an immutable binding?","options":["let","mut","var","const fn"],"answer":"A","explanation":"let bindings are immutable by default"},
  {"question":"What does the borrow checker enforce?","options":["Type inference","Aliasing rules"],"answer":"Aliasing rules"}
]}
```"#;

const TF_QUIZ: &str = r#"[{"question":"Rust has a garbage collector","answer":"False"}]"#;

const OPEN_QUIZ: &str =
    r#"{"questions":[{"question":"Explain ownership in one sentence.","answer":"Each value has a single owner that drops it."}]}"#;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_fenced_multiple_choice() {
    let questions = parse_quiz(MC_QUIZ, QuestionType::MultipleChoice).unwrap();

    assert_eq!(questions.len(), 2);
    // Letter answers are resolved to option text
    assert_eq!(questions[0].answer, "let");
    assert_eq!(questions[1].answer, "Aliasing rules");
    assert!(questions[0].explanation.is_some());
}

#[test]
fn test_parse_bare_array_true_false() {
    let questions = parse_quiz(TF_QUIZ, QuestionType::TrueFalse).unwrap();
    assert_eq!(questions[0].answer, "false");
    assert!(questions[0].options.is_empty());
}

#[test]
fn test_parse_with_surrounding_chatter() {
    let raw = format!("Sure! Here is your quiz:\n{}\nGood luck.", OPEN_QUIZ);
    let questions = parse_quiz(&raw, QuestionType::OpenEnded).unwrap();
    assert_eq!(questions.len(), 1);
}

#[test]
fn test_parse_rejects_unusable_output() {
    assert!(parse_quiz("I cannot help with that.", QuestionType::OpenEnded).is_none());
    assert!(parse_quiz(r#"{"questions":[]}"#, QuestionType::OpenEnded).is_none());
    // Multiple choice needs options and an answer among them
    assert!(parse_quiz(
        r#"{"questions":[{"question":"q","options":["only"],"answer":"only"}]}"#,
        QuestionType::MultipleChoice
    )
    .is_none());
    assert!(parse_quiz(
        r#"{"questions":[{"question":"q","options":["a","b"],"answer":"z"}]}"#,
        QuestionType::MultipleChoice
    )
    .is_none());
    assert!(parse_quiz(
        r#"[{"question":"q","answer":"maybe"}]"#,
        QuestionType::TrueFalse
    )
    .is_none());
}

#[test]
fn test_parse_grade() {
    let grade = parse_grade(r#"{"correct": true, "feedback": "Spot on."}"#).unwrap();
    assert!(grade.correct);
    assert_eq!(grade.feedback.as_deref(), Some("Spot on."));

    assert!(parse_grade("looks right to me").is_none());
}

#[test]
fn test_grade_locally() {
    let mc = parse_quiz(MC_QUIZ, QuestionType::MultipleChoice).unwrap();
    assert_eq!(grade_locally(&mc[0], QuestionType::MultipleChoice, "a"), Some(true));
    assert_eq!(grade_locally(&mc[0], QuestionType::MultipleChoice, "LET"), Some(true));
    assert_eq!(grade_locally(&mc[0], QuestionType::MultipleChoice, "B)"), Some(false));
    assert_eq!(grade_locally(&mc[0], QuestionType::MultipleChoice, "nonsense"), Some(false));

    let tf = parse_quiz(TF_QUIZ, QuestionType::TrueFalse).unwrap();
    assert_eq!(grade_locally(&tf[0], QuestionType::TrueFalse, "no"), Some(true));
    assert_eq!(grade_locally(&tf[0], QuestionType::TrueFalse, "True"), Some(false));

    let open = parse_quiz(OPEN_QUIZ, QuestionType::OpenEnded).unwrap();
    assert_eq!(grade_locally(&open[0], QuestionType::OpenEnded, "anything"), None);
}

#[test]
fn test_question_type_from_str() {
    assert_eq!("multiple-choice".parse::<QuestionType>(), Ok(QuestionType::MultipleChoice));
    assert_eq!("TRUE_FALSE".parse::<QuestionType>(), Ok(QuestionType::TrueFalse));
    assert_eq!("open_ended".parse::<QuestionType>(), Ok(QuestionType::OpenEnded));
    assert!("essay".parse::<QuestionType>().is_err());
}

// ============================================================================
// Service
// ============================================================================

struct Harness {
    service: QuizService,
    provider: MockProvider,
    quota: Arc<QuotaTracker>,
    sessions: Arc<MemorySessionStore>,
}

fn harness(quota: QuotaConfig) -> Harness {
    let provider = MockProvider::new();
    let quota = Arc::new(QuotaTracker::new(quota, Arc::new(MemoryQuotaStore::new())));
    let governor = Arc::new(RequestGovernor::new(
        GovernorConfig::default()
            .with_min_interval(Duration::ZERO)
            .with_post_success_pause(Duration::ZERO),
    ));
    let sessions = Arc::new(MemorySessionStore::new());
    let service = QuizService::new(
        quota.clone(),
        governor,
        Arc::new(provider.clone()),
        sessions.clone(),
    );
    Harness {
        service,
        provider,
        quota,
        sessions,
    }
}

#[tokio::test(start_paused = true)]
async fn test_generate_structured_quiz() {
    let h = harness(QuotaConfig::default());
    h.provider.push_text(MC_QUIZ);

    let session = h
        .service
        .generate_quiz(QuizRequest::topic(
            "Rust ownership and borrowing",
            QuestionType::MultipleChoice,
            2,
        ))
        .await
        .unwrap();

    assert_eq!(session.outcome.questions().unwrap().len(), 2);
    assert_eq!(session.source_label, "Rust ownership and borrowing");
    assert!(h.sessions.get(session.id).await.unwrap().is_some());
    assert!(h.provider.prompts()[0].contains("Rust ownership and borrowing"));
    assert_eq!(h.quota.check().await.state.requests_today, 1);
}

#[tokio::test(start_paused = true)]
async fn test_generate_unstructured_fallback() {
    let h = harness(QuotaConfig::default());
    h.provider.push_text("Here are some thoughts about Rust, but no JSON.");

    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::OpenEnded, 3))
        .await
        .unwrap();

    assert_eq!(
        session.outcome,
        QuizOutcome::Unstructured {
            raw: "Here are some thoughts about Rust, but no JSON.".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_generate_rejects_bad_input_before_quota() {
    let h = harness(QuotaConfig::default());

    let too_many = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::TrueFalse, 21))
        .await;
    assert!(matches!(too_many, Err(Error::InvalidInput(_))));

    let empty = h
        .service
        .generate_quiz(QuizRequest::document(
            "empty.txt",
            "   ",
            QuestionType::TrueFalse,
            5,
        ))
        .await;
    assert!(matches!(empty, Err(Error::InvalidInput(_))));

    assert_eq!(h.provider.call_count(), 0);
    assert_eq!(h.quota.check().await.state.requests_today, 0);
}

#[tokio::test(start_paused = true)]
async fn test_generate_denied_when_minute_quota_reached() {
    let h = harness(QuotaConfig {
        minute_quota: 1,
        ..QuotaConfig::default()
    });
    h.provider.push_text(TF_QUIZ);

    h.service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::TrueFalse, 1))
        .await
        .unwrap();
    let denied = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::TrueFalse, 1))
        .await
        .unwrap_err();

    assert!(matches!(denied, Error::AdmissionDenied { .. }));
    let retry_after = denied.retry_after_secs().unwrap();
    assert!((1..=60).contains(&retry_after));
    assert_eq!(h.provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_generate_surfaces_backend_failure() {
    let h = harness(QuotaConfig::default());
    h.provider
        .push_outcome(Err(quizforge_llm::Error::Api("PERMISSION_DENIED".to_string())));

    let err = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::OpenEnded, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Backend(_)));
    assert!(h.sessions.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_generate_retries_rate_limited_backend() {
    let h = harness(QuotaConfig::default());
    h.provider.push_outcome(Err(quizforge_llm::Error::rate_limited_for(
        Duration::from_secs(5),
    )));
    h.provider.push_text(TF_QUIZ);

    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::TrueFalse, 1))
        .await
        .unwrap();

    assert!(session.outcome.questions().is_some());
    assert_eq!(h.provider.call_count(), 2);
    // One recorded use even though the backend saw two dispatches
    assert_eq!(h.quota.check().await.state.requests_today, 1);
}

#[tokio::test(start_paused = true)]
async fn test_validate_locally_graded_answer_skips_backend() {
    let h = harness(QuotaConfig::default());
    h.provider.push_text(MC_QUIZ);
    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::MultipleChoice, 2))
        .await
        .unwrap();

    let record = h
        .service
        .validate_answer(
            session.id,
            AnswerSubmission {
                question_index: 1,
                answer: "b".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(record.grade.verdict, Verdict::Correct);
    assert_eq!(record.grade.graded_by, GradedBy::Local);
    assert_eq!(h.provider.call_count(), 1);
    assert_eq!(h.quota.check().await.state.requests_today, 1);

    let stored = h.sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(stored.answers.len(), 1);
    assert_eq!(stored.score(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_validate_open_ended_uses_backend() {
    let h = harness(QuotaConfig::default());
    h.provider.push_text(OPEN_QUIZ);
    h.provider
        .push_text(r#"{"correct": false, "feedback": "Ownership is about who drops a value."}"#);
    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::OpenEnded, 1))
        .await
        .unwrap();

    let record = h
        .service
        .validate_answer(
            session.id,
            AnswerSubmission {
                question_index: 0,
                answer: "It is about speed.".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(record.grade.verdict, Verdict::Incorrect);
    assert_eq!(record.grade.graded_by, GradedBy::Ai);
    assert_eq!(h.provider.call_count(), 2);
    assert_eq!(h.quota.check().await.state.requests_today, 2);
}

#[tokio::test(start_paused = true)]
async fn test_validate_open_ended_ungraded_fallback() {
    let h = harness(QuotaConfig::default());
    h.provider.push_text(OPEN_QUIZ);
    h.provider.push_text("Mostly right, I think.");
    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::OpenEnded, 1))
        .await
        .unwrap();

    let record = h
        .service
        .validate_answer(
            session.id,
            AnswerSubmission {
                question_index: 0,
                answer: "Values have one owner.".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(record.grade.verdict, Verdict::Ungraded);
    assert_eq!(
        record.grade.feedback.as_deref(),
        Some("Mostly right, I think.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_validate_answer_errors() {
    let h = harness(QuotaConfig::default());

    let missing = h
        .service
        .validate_answer(
            Uuid::new_v4(),
            AnswerSubmission {
                question_index: 0,
                answer: "a".to_string(),
            },
        )
        .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    h.provider.push_text("no structure here");
    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::MultipleChoice, 1))
        .await
        .unwrap();
    let unstructured = h
        .service
        .validate_answer(
            session.id,
            AnswerSubmission {
                question_index: 0,
                answer: "a".to_string(),
            },
        )
        .await;
    assert!(matches!(unstructured, Err(Error::InvalidInput(_))));
}

#[tokio::test(start_paused = true)]
async fn test_validate_out_of_range_index() {
    let h = harness(QuotaConfig::default());
    h.provider.push_text(TF_QUIZ);
    let session = h
        .service
        .generate_quiz(QuizRequest::topic("Rust", QuestionType::TrueFalse, 1))
        .await
        .unwrap();

    let result = h
        .service
        .validate_answer(
            session.id,
            AnswerSubmission {
                question_index: 5,
                answer: "true".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
