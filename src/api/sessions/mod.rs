//! Sessions API endpoints
//!
//! GET    /api/v1/sessions             - List sessions, newest first
//! GET    /api/v1/sessions/:id         - Get a session with its questions and answers
//! DELETE /api/v1/sessions/:id         - Delete a session
//! POST   /api/v1/sessions/:id/answers - Validate an answer

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use quizforge_core::{AnswerRecord, AnswerSubmission, Error, QuizSession, SessionSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::response::{ApiResponse, ApiResult};
use super::AppState;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

/// Query for session listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    pub limit: Option<usize>,
}

/// Graded answer plus the session's running score.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    #[serde(flatten)]
    pub record: AnswerRecord,
    pub score: usize,
    pub answered: usize,
}

/// List sessions.
async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Vec<SessionSummary>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let sessions = state.service.sessions().list(limit).await?;
    Ok(Json(ApiResponse::success(sessions)))
}

/// Get session details.
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuizSession> {
    let session = state
        .service
        .sessions()
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
    Ok(Json(ApiResponse::success(session)))
}

/// Delete a session.
async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    if !state.service.sessions().delete(id).await? {
        return Err(Error::NotFound(format!("session {}", id)).into());
    }
    Ok(Json(ApiResponse::success(())))
}

/// Validate an answer to one question of a session.
async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(submission): Json<AnswerSubmission>,
) -> ApiResult<AnswerResponse> {
    let record = state.service.validate_answer(id, submission).await?;

    let (score, answered) = match state.service.sessions().get(id).await? {
        Some(session) => (session.score(), session.answers.len()),
        None => (0, 0),
    };

    Ok(Json(ApiResponse::success(AnswerResponse {
        record,
        score,
        answered,
    })))
}

/// Create session routes
pub fn sessions_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/sessions", get(list_sessions))
        .route(
            "/api/v1/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route("/api/v1/sessions/:id/answers", post(submit_answer))
        .with_state(state)
}
