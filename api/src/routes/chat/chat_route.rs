//! POST /chat: answers a question with country-scoped RAG context.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::{ChatRequest, ChatResponse},
};

/// Handler: POST /chat
///
/// Always answers 200 for a valid request; pipeline failures are reported
/// through `status` and `detail`.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chat \
///   -H 'content-type: application/json' \
///   -d '{"question":"What is the capital?","country":"albania"}'
/// ```
#[instrument(name = "chat_route", skip_all)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if body.question.trim().is_empty() {
        return Err(AppError::bad_request("question", "question must not be blank"));
    }
    let country = body
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&state.config.default_country);

    info!(country = %country, history_turns = body.history.len(), "chat request");

    let qa = state.pipeline.ask(&body.question, country, &body.history).await;
    Ok(Json(qa.into()))
}
