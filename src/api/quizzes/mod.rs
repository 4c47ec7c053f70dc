//! Quiz generation endpoints
//!
//! POST /api/v1/quizzes        - Generate a quiz from a typed topic
//! POST /api/v1/quizzes/upload - Generate a quiz from an uploaded document

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use quizforge_core::{extract_text, DocumentKind, QuestionType, QuizRequest, QuizSession};
use serde::Deserialize;
use tracing::{debug, info};

use super::response::{ApiError, ApiResponse, ApiResult};
use super::AppState;

const DEFAULT_QUESTION_COUNT: u32 = 5;

fn default_count() -> u32 {
    DEFAULT_QUESTION_COUNT
}

/// Request to generate a quiz on a topic.
#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    /// Topic or pasted study material
    pub topic: String,
    pub question_type: QuestionType,
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Parsed multipart upload
#[derive(Debug)]
struct UploadForm {
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
    question_type: QuestionType,
    count: u32,
}

/// Generate a quiz on a topic.
async fn create_quiz(
    State(state): State<AppState>,
    Json(request): Json<CreateQuizRequest>,
) -> ApiResult<QuizSession> {
    let session = state
        .service
        .generate_quiz(QuizRequest::topic(
            request.topic,
            request.question_type,
            request.count,
        ))
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

/// Generate a quiz from an uploaded document.
async fn upload_quiz(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<QuizSession> {
    let form = read_upload(multipart, state.upload_max_bytes).await?;

    let kind = DocumentKind::detect(&form.file_name, form.content_type.as_deref());
    let text = extract_text(&form.bytes, &kind)?;
    info!(
        file_name = %form.file_name,
        kind = ?kind,
        bytes = form.bytes.len(),
        "Document uploaded"
    );

    let session = state
        .service
        .generate_quiz(QuizRequest::document(
            form.file_name,
            text,
            form.question_type,
            form.count,
        ))
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut question_type = QuestionType::MultipleChoice;
    let mut count = DEFAULT_QUESTION_COUNT;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                if bytes.len() > max_bytes {
                    return Err(ApiError::bad_request(format!(
                        "File exceeds the {} byte upload limit",
                        max_bytes
                    )));
                }
                file = Some((file_name, content_type, bytes));
            }
            "question_type" => {
                let text = field_text(field).await?;
                question_type = text.parse().map_err(ApiError::bad_request)?;
            }
            "count" => {
                let text = field_text(field).await?;
                count = text
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("Invalid count '{}'", text)))?;
            }
            other => debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    Ok(UploadForm {
        file_name,
        content_type,
        bytes,
        question_type,
        count,
    })
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map(|text| text.trim().to_string())
        .map_err(|e| ApiError::bad_request(format!("Invalid form field: {}", e)))
}

/// Create quiz routes
pub fn quizzes_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/quizzes", post(create_quiz))
        .route("/api/v1/quizzes/upload", post(upload_quiz))
        .with_state(state)
}

#[cfg(test)]
mod tests;
