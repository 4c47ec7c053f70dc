//! Tests for Gemini provider

use super::config::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::provider::{classify_error, suggested_retry_delay, GeminiProvider};
use super::security::sanitize_api_error;
use super::types::GeminiError;
use crate::completion::CompletionRequest;
use crate::error::Error;
use crate::provider::LlmProvider;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_config_builder() {
    let config = GeminiConfig::new("test-key")
        .with_model("gemini-2.5-pro")
        .with_max_tokens(4096)
        .with_timeout(Duration::from_secs(30));

    assert_eq!(config.api_key, "test-key");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.default_model, "gemini-2.5-pro");
    assert_eq!(config.default_max_tokens, 4096);
    assert_eq!(config.timeout, Duration::from_secs(30));
}

#[test]
fn test_config_debug_masks_key() {
    let config = GeminiConfig::new("AIzaSecretSecretSecret1234");
    let debug = format!("{:?}", config);
    assert!(!debug.contains("SecretSecret"));
    assert!(debug.contains("AIza...1234"));
}

#[test]
fn test_classify_rate_limit_with_retry_delay_detail() {
    let body = r#"{
        "error": {
            "code": 429,
            "message": "Resource has been exhausted",
            "status": "RESOURCE_EXHAUSTED",
            "details": [
                {"@type": "type.googleapis.com/google.rpc.QuotaFailure"},
                {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "5s"}
            ]
        }
    }"#;

    let err = classify_error(429, body, None);
    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
}

#[test]
fn test_classify_rate_limit_from_message() {
    let body = r#"{"error": {"code": 429, "message": "Your quota will reset after 17s.", "status": "RESOURCE_EXHAUSTED"}}"#;
    let err = classify_error(429, body, None);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(17)));
}

#[test]
fn test_classify_rate_limit_falls_back_to_header() {
    let err = classify_error(429, "not json", Some(Duration::from_secs(9)));
    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(9)));

    let err = classify_error(429, "", None);
    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), None);
}

#[test]
fn test_classify_non_rate_limit_errors() {
    let body = r#"{"error": {"code": 400, "message": "Invalid JSON payload", "status": "INVALID_ARGUMENT"}}"#;
    assert!(matches!(classify_error(400, body, None), Error::Api(_)));

    let body = r#"{"error": {"code": 503, "message": "The model is overloaded", "status": "UNAVAILABLE"}}"#;
    assert!(matches!(classify_error(503, body, None), Error::ServerError(_)));

    assert!(matches!(classify_error(502, "<html>", None), Error::ServerError(_)));
    assert!(matches!(classify_error(404, "<html>", None), Error::Api(_)));
}

#[test]
fn test_fractional_retry_delay() {
    let parsed: GeminiError = serde_json::from_str(
        r#"{"error": {"code": 429, "message": "", "status": "", "details": [{"retryDelay": "1.5s"}]}}"#,
    )
    .unwrap();
    assert_eq!(
        suggested_retry_delay(&parsed.error),
        Some(Duration::from_millis(1500))
    );
}

#[test]
fn test_unrepresentable_retry_delay_is_ignored() {
    let body = r#"{"error": {"code": 429, "message": "", "status": "RESOURCE_EXHAUSTED", "details": [{"retryDelay": "1e20s"}]}}"#;
    let err = classify_error(429, body, Some(Duration::from_secs(9)));
    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(9)));

    let body = r#"{"error": {"code": 429, "message": "", "status": "RESOURCE_EXHAUSTED", "details": [{"retryDelay": "-3s"}]}}"#;
    let err = classify_error(429, body, None);
    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), None);
}

// Security tests

#[test]
fn test_sanitize_auth_error() {
    let sanitized = sanitize_api_error("INVALID_ARGUMENT: API key not valid");
    assert!(!sanitized.contains("not valid"));
    assert!(sanitized.contains("authentication"));
}

#[test]
fn test_sanitize_truncates_long_message() {
    let long = "x".repeat(1000);
    let sanitized = sanitize_api_error(&long);
    assert!(sanitized.len() < 400);
    assert!(sanitized.ends_with("...(truncated)"));
}

// HTTP round trips

fn provider_for(server: &MockServer) -> GeminiProvider {
    GeminiProvider::new(GeminiConfig::new("test-key-123456").with_base_url(server.uri())).unwrap()
}

#[tokio::test]
async fn test_complete_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", DEFAULT_MODEL)))
        .and(query_param("key", "test-key-123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"questions\": "}, {"text": "[]}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let response = provider
        .complete(CompletionRequest::new("make a quiz").with_json_output())
        .await
        .unwrap();

    assert_eq!(response.content, "{\"questions\": []}");
    assert_eq!(response.model, DEFAULT_MODEL);
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(response.usage.unwrap().total_tokens, 17);
}

#[tokio::test]
async fn test_complete_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded",
                "status": "RESOURCE_EXHAUSTED",
                "details": [{"retryDelay": "5s"}]
            }
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(CompletionRequest::new("make a quiz"))
        .await
        .unwrap_err();

    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn test_complete_without_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(CompletionRequest::new("make a quiz"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidResponse(_)));
}
