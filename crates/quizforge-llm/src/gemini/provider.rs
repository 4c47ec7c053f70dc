//! Gemini provider implementation

use super::config::GeminiConfig;
use super::security::sanitize_api_error;
use super::types::*;
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    pub(crate) config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let max_tokens = request
            .max_tokens
            .unwrap_or(self.config.default_max_tokens);

        GeminiRequest {
            contents: vec![GeminiContent::text(Some("user"), request.prompt.clone())],
            system_instruction: request
                .system
                .as_ref()
                .map(|s| GeminiContent::text(None, s.clone())),
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: Some(max_tokens),
                response_mime_type: request
                    .json_output
                    .then(|| "application/json".to_string()),
            }),
        }
    }

    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        // SECURITY: Don't log the full URL (contains API key)
        debug!("Sending request to Gemini model: {}", model);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(sanitize_api_error(&e.without_url().to_string()))
                }
            })?;

        let status = response.status();
        let header_retry = retry_after_header(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(status = %status, "Gemini API error response");
            return Err(classify_error(status.as_u16(), &body, header_retry));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!(
                "{}: {}",
                e,
                crate::util::truncate_safe(&body, 200)
            ))
        })
    }
}

/// Map a non-success Gemini response onto the error taxonomy.
///
/// 429 becomes [`Error::RateLimit`] carrying whatever delay the backend
/// suggested (`retryDelay` detail, "reset after Ns" message, or the
/// `Retry-After` header, in that order).
pub(crate) fn classify_error(status: u16, body: &str, header_retry: Option<Duration>) -> Error {
    let parsed = serde_json::from_str::<GeminiError>(body).ok();

    if status == 429 {
        let retry_after = parsed
            .as_ref()
            .and_then(|e| suggested_retry_delay(&e.error))
            .or(header_retry);
        return Error::RateLimit { retry_after };
    }

    match parsed {
        Some(error) => {
            warn!(
                error_status = %error.error.status,
                error_code = error.error.code,
                "Gemini API error detail"
            );
            let message = sanitize_api_error(&format!(
                "{}: {}",
                error.error.status, error.error.message
            ));
            if (500..600).contains(&status) {
                Error::ServerError(message)
            } else {
                Error::Api(message)
            }
        }
        None if (500..600).contains(&status) => {
            Error::ServerError(sanitize_api_error(&format!("HTTP {}", status)))
        }
        // SECURITY: Don't expose raw HTTP response body
        None => Error::Api(sanitize_api_error(&format!("HTTP {}", status))),
    }
}

/// Extract the backend's retry hint from a 429 error body.
pub(crate) fn suggested_retry_delay(detail: &GeminiErrorDetail) -> Option<Duration> {
    let from_details = detail.details.as_ref().and_then(|details| {
        details
            .iter()
            .filter_map(|d| d.get("retryDelay").and_then(|v| v.as_str()))
            .find_map(parse_seconds)
    });
    if from_details.is_some() {
        return from_details;
    }

    // "Your quota will reset after 17s."
    let pos = detail.message.find("reset after ")?;
    let rest = &detail.message[pos + "reset after ".len()..];
    let end = rest.find('s')?;
    parse_seconds(&rest[..=end])
}

/// Parse `"5s"` / `"1.5s"` into a duration.
fn parse_seconds(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().strip_suffix('s')?.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn into_completion(response: GeminiResponse, model: &str) -> Result<CompletionResponse> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidResponse("no candidates in response".to_string()))?;

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let usage = response.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count.unwrap_or(0),
        total_tokens: u.total_token_count,
    });

    Ok(CompletionResponse {
        content,
        usage,
        finish_reason: candidate.finish_reason,
        model: model.to_string(),
    })
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = tracing::field::Empty))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };
        tracing::Span::current().record("model", model.as_str());

        let gemini_request = self.build_request(&request);
        let response = self.send_request(&model, &gemini_request).await?;
        into_completion(response, &model)
    }
}
