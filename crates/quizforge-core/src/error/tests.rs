use super::*;

#[test]
fn test_admission_denied_message() {
    let error = Error::AdmissionDenied {
        retry_after_secs: 42,
    };

    assert!(error.is_busy());
    assert_eq!(error.retry_after_secs(), Some(42));
    assert!(error.user_message().contains("42 seconds"));
}

#[test]
fn test_retries_exhausted_uses_backend_hint() {
    let error = Error::RetriesExhausted {
        attempts: 4,
        retry_after_secs: Some(20),
        last_error: quizforge_llm::Error::rate_limited(),
    };

    assert!(error.is_busy());
    assert_eq!(error.retry_after_secs(), Some(20));
    assert!(error.user_message().contains("busy"));
    assert!(error.to_string().contains("4 attempts"));
}

#[test]
fn test_retries_exhausted_default_hint() {
    let error = Error::RetriesExhausted {
        attempts: 4,
        retry_after_secs: None,
        last_error: quizforge_llm::Error::rate_limited(),
    };
    assert_eq!(error.retry_after_secs(), Some(60));
}

#[test]
fn test_backend_error_is_generic() {
    let error = Error::from(quizforge_llm::Error::Api("INVALID_ARGUMENT: bad".to_string()));

    assert!(!error.is_busy());
    assert_eq!(error.retry_after_secs(), None);
    assert!(!error.user_message().contains("INVALID_ARGUMENT"));
}

#[test]
fn test_invalid_config_display() {
    let error = Error::invalid_config("quota.minute_quota", "must be greater than 0");
    assert_eq!(
        error.to_string(),
        "invalid configuration: quota.minute_quota: must be greater than 0"
    );
}
