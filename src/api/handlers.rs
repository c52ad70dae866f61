//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ErrorResponse, MessageRequest, StateResponse, TurnResponse};
use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/conversations/:id/messages", post(post_message))
        .route("/api/conversations/:id/stream", get(stream_conversation))
        .route("/api/conversations/:id/deactivate", post(deactivate))
        .route(
            "/api/conversations/:id/deep-exploration/reset",
            post(reset_deep_exploration),
        )
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text must not be empty".to_string()));
    }

    let turn = state.sessions.on_message(&id, req.into()).await;
    Ok(Json(turn.into()))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StateResponse>, AppError> {
    let conversation_state = state
        .sessions
        .snapshot(&id)
        .await
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(StateResponse {
        conversation_id: id,
        state: conversation_state,
    }))
}

async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, AppError> {
    let turn = state
        .sessions
        .deactivate(&id)
        .await
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(turn.into()))
}

async fn reset_deep_exploration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StateResponse>, AppError> {
    let conversation_state = state
        .sessions
        .reset_deep_exploration(&id)
        .await
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(StateResponse {
        conversation_id: id,
        state: conversation_state,
    }))
}

async fn stream_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let rx = state.sessions.subscribe(&id).await;
    tracing::debug!(conversation_id = %id, "SSE subscriber connected");
    sse_stream(rx)
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("consult-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Conversation not found: {id}"))
}

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
