//! Response envelope and error mapping shared by all handlers

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use quizforge_core::Error;
use serde::Serialize;
use tracing::{error, warn};

/// Standard API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying a core error
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Shorthand for a 400 with the given message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(Error::InvalidInput(message.into()))
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::AdmissionDenied { .. } | Error::RetriesExhausted { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Backend(_) => StatusCode::BAD_GATEWAY,
            Error::GovernorClosed => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidConfig { .. } | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            error!(error = %self.0, "Request failed");
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(error = %self.0, "Request refused, service busy");
        }

        let body = Json(ApiResponse::<()>::error(self.0.user_message()));
        let mut response = (status, body).into_response();

        if let Some(secs) = self.0.retry_after_secs() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
