use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{error, info, warn};

use crate::agents::{ReplyAgent, StreamEnd};
use crate::models::{AppState, ChatRequest};
use crate::types::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(post_chat))
        .with_state(state)
}

/// POST /api/chat - Stream an answer grounded in the menu index
///
/// Failures before the first fragment get a JSON 500. After that the
/// response is committed and a failure only truncates the body.
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let question = match request.question {
        Some(q) if !q.trim().is_empty() => q,
        _ => return AppError::InvalidRequest("Question is required".to_string()).into_response(),
    };

    info!(history = request.history.len(), "Received chat request");

    let reply = match ReplyAgent::start(&state, &question, &request.history).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "Error in /api/chat before streaming");
            return e.into_response();
        }
    };

    let body = Body::from_stream(reply.forward(log_stream_end));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

fn log_stream_end(end: StreamEnd) {
    match end {
        StreamEnd::Completed { fragments, bytes } => {
            info!(fragments, bytes, "Chat stream completed");
        }
        StreamEnd::Failed {
            error,
            fragments,
            bytes,
        } => {
            warn!(fragments, bytes, "Chat stream ended early");
            error!(error = %error, "Error in /api/chat stream");
        }
    }
}
