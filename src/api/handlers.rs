//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CancelResponse, ConversationRequest, ErrorResponse, ResetResponse, SessionsResponse,
    StartRequest, StreamQuery, TurnResponse,
};
use super::AppState;
use crate::debate::{spawn_run, DebateError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const RESET_MESSAGE: &str = "Conversation history has been reset.";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Client-driven turns
        .route("/api/start", post(start_debate))
        .route("/api/conversation", post(continue_debate))
        .route("/api/reset", post(reset))
        // Server-driven runs
        .route("/api/debate/stream", get(stream_debate))
        .route("/api/cancel", post(cancel_run))
        // Diagnostics
        .route("/api/sessions", get(list_sessions))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Client-driven turns
// ============================================================

async fn start_debate(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let outcome = state.orchestrator.start(&req.topic).await?;
    Ok(Json(outcome.into()))
}

async fn continue_debate(
    State(state): State<AppState>,
    Json(req): Json<ConversationRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let outcome = state
        .orchestrator
        .respond(req.current, &req.message)
        .await?;
    Ok(Json(outcome.into()))
}

/// Any request body is ignored
async fn reset(State(state): State<AppState>) -> Json<ResetResponse> {
    state.orchestrator.reset();
    Json(ResetResponse {
        success: true,
        message: RESET_MESSAGE.to_string(),
    })
}

// ============================================================
// Server-driven runs
// ============================================================

async fn stream_debate(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.topic.trim().is_empty() {
        return Err(DebateError::EmptyPrompt("topic").into());
    }

    let events = spawn_run(state.orchestrator.clone(), query.topic, query.starter);
    Ok(sse_stream(events))
}

async fn cancel_run(State(state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.orchestrator.cancel_run(),
    })
}

// ============================================================
// Diagnostics
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let orchestrator = &state.orchestrator;
    Json(SessionsResponse {
        sessions: orchestrator.snapshot(),
        history_cap: orchestrator.history_cap(),
        active_run: orchestrator.has_active_run(),
    })
}

async fn get_version() -> &'static str {
    concat!("debate-relay ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<DebateError> for AppError {
    fn from(e: DebateError) -> Self {
        let message = e.to_string();
        match e {
            DebateError::EmptyPrompt(_) => AppError::BadRequest(message),
            DebateError::ParticipantBusy(_) => AppError::Conflict(message),
            DebateError::Provider(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Debate turn failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
