use super::*;
use crate::api::test_support::{test_state, test_state_with_quota, TF_QUIZ};
use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::{header, StatusCode};
use quizforge_core::{QuizOutcome, QuotaConfig};
use quizforge_llm::MockProvider;

const BOUNDARY: &str = "quizforge-test-boundary";

fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Request {
    let mut body = String::new();
    for (name, file_name, value) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        match file_name {
            Some(file_name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n",
                name, file_name
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                name
            )),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri("/api/v1/quizzes/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Multipart {
    Multipart::from_request(multipart_body(parts), &())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_quiz_from_topic() {
    let mock = MockProvider::new();
    mock.push_text(TF_QUIZ);
    let state = test_state(&mock);

    let response = create_quiz(
        State(state.clone()),
        Json(CreateQuizRequest {
            topic: "Rust basics".to_string(),
            question_type: QuestionType::TrueFalse,
            count: 2,
        }),
    )
    .await
    .unwrap();

    assert!(response.0.success);
    let session = response.0.data.unwrap();
    assert_eq!(session.source_label, "Rust basics");
    assert_eq!(session.outcome.questions().unwrap().len(), 2);
    assert_eq!(mock.call_count(), 1);

    let stored = state.service.sessions().get(session.id).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_create_quiz_keeps_unstructured_output() {
    let mock = MockProvider::new();
    mock.push_text("Here are some questions, in prose.");
    let state = test_state(&mock);

    let response = create_quiz(
        State(state),
        Json(CreateQuizRequest {
            topic: "Rust basics".to_string(),
            question_type: QuestionType::OpenEnded,
            count: 3,
        }),
    )
    .await
    .unwrap();

    let session = response.0.data.unwrap();
    assert!(matches!(session.outcome, QuizOutcome::Unstructured { .. }));
}

#[tokio::test]
async fn test_create_quiz_rejects_bad_count() {
    let mock = MockProvider::new();
    let state = test_state(&mock);

    let err = create_quiz(
        State(state),
        Json(CreateQuizRequest {
            topic: "Rust".to_string(),
            question_type: QuestionType::TrueFalse,
            count: 0,
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_create_quiz_busy_when_minute_quota_spent() {
    let mock = MockProvider::new().with_fallback(TF_QUIZ);
    let quota = QuotaConfig {
        minute_quota: 1,
        ..QuotaConfig::default()
    };
    let state = test_state_with_quota(&mock, quota);

    let request = || {
        Json(CreateQuizRequest {
            topic: "Rust".to_string(),
            question_type: QuestionType::TrueFalse,
            count: 2,
        })
    };

    assert!(create_quiz(State(state.clone()), request()).await.is_ok());

    let err = create_quiz(State(state), request()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(err.0.retry_after_secs().unwrap() >= 1);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_upload_quiz_from_text_file() {
    let mock = MockProvider::new();
    mock.push_text(TF_QUIZ);
    let state = test_state(&mock);

    let form = multipart(&[
        ("file", Some("notes.txt"), "Ownership moves values between bindings."),
        ("question_type", None, "true_false"),
        ("count", None, "2"),
    ])
    .await;

    let response = upload_quiz(State(state), form).await.unwrap();
    let session = response.0.data.unwrap();

    assert_eq!(session.question_type, QuestionType::TrueFalse);
    assert!(session.source_label.contains("notes.txt"));
    assert!(mock.prompts()[0].contains("Ownership moves values"));
}

#[tokio::test]
async fn test_upload_rejects_unsupported_document() {
    let mock = MockProvider::new();
    let state = test_state(&mock);

    let form = multipart(&[("file", Some("slides.pdf"), "%PDF-1.7")]).await;

    let err = upload_quiz(State(state), form).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let mock = MockProvider::new();
    let state = test_state(&mock);

    let form = multipart(&[("question_type", None, "open_ended")]).await;

    let err = upload_quiz(State(state), form).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_enforces_size_limit() {
    let mock = MockProvider::new();
    let state = test_state(&mock);
    let large = "a".repeat(state.upload_max_bytes + 1);

    let form = multipart(&[("file", Some("big.txt"), large.as_str())]).await;

    let err = upload_quiz(State(state), form).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.0.user_message().contains("upload limit"));
}

#[tokio::test]
async fn test_upload_rejects_unknown_question_type() {
    let mock = MockProvider::new();
    let state = test_state(&mock);

    let form = multipart(&[
        ("question_type", None, "essay"),
        ("file", Some("notes.txt"), "text"),
    ])
    .await;

    let err = upload_quiz(State(state), form).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}
