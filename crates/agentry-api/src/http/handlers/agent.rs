//! Agent lifecycle handlers.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use agentry_types::agent::{Agent, AgentId, CreateAgentRequest, UpdateAgentRequest};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

pub(crate) fn parse_id(id: &str) -> Result<AgentId, AppError> {
    AgentId::new(id).map_err(|e| AppError::Validation(e.to_string()))
}

/// POST /api/v1/agents - Create a new agent.
pub async fn create_agent(
    State(state): State<AppState>,
    Json(body): Json<CreateAgentRequest>,
) -> Result<Json<ApiResponse<Agent>>, AppError> {
    let timer = RequestTimer::start();
    let agent = state.agent_service.create(body).await?;
    Ok(timer.respond(agent))
}

/// GET /api/v1/agents - List all agents.
pub async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Agent>>>, AppError> {
    let timer = RequestTimer::start();
    let agents = state.agent_service.list().await?;
    Ok(timer.respond(agents))
}

/// GET /api/v1/agents/:id - Get an agent.
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Agent>>, AppError> {
    let timer = RequestTimer::start();
    let agent = state.agent_service.get(&parse_id(&id)?).await?;
    Ok(timer.respond(agent))
}

/// PUT /api/v1/agents/:id - Partially update an agent.
pub async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAgentRequest>,
) -> Result<Json<ApiResponse<Agent>>, AppError> {
    let timer = RequestTimer::start();
    let agent = state.agent_service.update(&parse_id(&id)?, body).await?;
    Ok(timer.respond(agent))
}

/// DELETE /api/v1/agents/:id - Delete an agent permanently.
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_id(&id)?;
    state.agent_service.delete(&id).await?;
    Ok(timer.respond(serde_json::json!({"deleted": id})))
}

/// GET /api/v1/agents/:id/export - Full agent JSON for backup/transfer.
pub async fn export_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Agent>>, AppError> {
    let timer = RequestTimer::start();
    let agent = state.agent_service.export(&parse_id(&id)?).await?;
    Ok(timer.respond(agent))
}

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub agent: Agent,
    /// False when an existing agent with this id was overwritten.
    pub created: bool,
}

/// POST /api/v1/agents/import - Create-or-replace from exported JSON.
pub async fn import_agent(
    State(state): State<AppState>,
    Json(agent): Json<Agent>,
) -> Result<Json<ApiResponse<ImportResult>>, AppError> {
    let timer = RequestTimer::start();
    let id = agent.id.clone();
    let created = state.agent_service.import(agent).await?;
    let agent = state.agent_service.get(&id).await?;
    Ok(timer.respond(ImportResult { agent, created }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearMemoryRequest {
    /// When absent, every chat of the agent is cleared.
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// POST /api/v1/agents/:id/memory/clear - Drop conversation memory.
pub async fn clear_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ClearMemoryRequest>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let chat_id = body.and_then(|Json(b)| b.chat_id);
    let deleted = state
        .agent_service
        .clear_memory(&parse_id(&id)?, chat_id.as_deref())
        .await?;
    Ok(timer.respond(serde_json::json!({"deleted_messages": deleted})))
}
