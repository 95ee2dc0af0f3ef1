//! Chat invocation handler.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use agentry_core::chat::ChatRequest;
use agentry_types::chat::{ChatMessage, Entrypoint};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

use super::agent::parse_id;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub chat_id: String,
    /// Caller identity; matched against the agent owner for trusted access.
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
}

/// POST /api/v1/agents/:id/chat - Send one message and get the reply.
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ApiResponse<ChatMessage>>, AppError> {
    let timer = RequestTimer::start();
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".into()));
    }
    if body.chat_id.trim().is_empty() {
        return Err(AppError::Validation("chat_id must not be empty".into()));
    }

    let reply = state
        .chat_service
        .handle(ChatRequest {
            agent_id: parse_id(&id)?,
            chat_id: body.chat_id,
            user_id: body.user_id,
            message: body.message,
            origin: Entrypoint::Api,
        })
        .await?;
    Ok(timer.respond(reply))
}

/// GET /api/v1/agents/:id/chats/:chat_id/messages - Full chat transcript.
pub async fn get_messages(
    State(state): State<AppState>,
    Path((id, chat_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    use agentry_core::memory::MemoryRepository;

    let timer = RequestTimer::start();
    let id = parse_id(&id)?;
    // Resolve through the admin service so a missing agent is a 404 rather
    // than an empty list.
    state.agent_service.get(&id).await?;
    let messages = state.memory.list(&id, &chat_id).await?;
    Ok(timer.respond(messages))
}
