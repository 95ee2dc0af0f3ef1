//! ChatService: resolve agent, enforce quota, run the executor, persist.
//!
//! Every entrypoint (HTTP API, channel pollers, autonomous scheduler)
//! builds a [`ChatRequest`] and calls [`ChatService::handle`]; none of them
//! carries its own execution logic.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use agentry_types::agent::{Agent, AgentId};
use agentry_types::chat::{ChatMessage, Entrypoint, MessageRole, NewChatMessage};
use agentry_types::error::ChatError;
use agentry_types::quota::QuotaKind;
use agentry_types::skill::CallerTrust;

use crate::agent::AgentRuntime;
use crate::memory::MemoryRepository;
use crate::quota::QuotaRepository;
use crate::repository::AgentRepository;
use crate::skill::{BoxSkillStore, SkillContext, SkillFactory};

/// One inbound message for an agent, from any entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub agent_id: AgentId,
    pub chat_id: String,
    /// External caller identity; compared against the agent owner for trust.
    pub user_id: Option<String>,
    pub message: String,
    pub origin: Entrypoint,
}

/// Orchestrates the full request lifecycle.
///
/// Generic over the repository traits so agentry-core never depends on
/// agentry-infra; concrete aliases are pinned in the binary crate.
pub struct ChatService<A, Q, M, F>
where
    A: AgentRepository,
    Q: QuotaRepository,
    M: MemoryRepository,
    F: SkillFactory,
{
    agents: A,
    quotas: Q,
    memory: M,
    runtime: Arc<AgentRuntime<F>>,
    store: Arc<BoxSkillStore>,
    // Serializes concurrent requests to the same chat so seq assignment and
    // history reads never interleave. Entries are tiny and live for the
    // process; the map grows with the number of distinct chats.
    chat_locks: DashMap<(AgentId, String), Arc<Mutex<()>>>,
}

impl<A, Q, M, F> ChatService<A, Q, M, F>
where
    A: AgentRepository,
    Q: QuotaRepository,
    M: MemoryRepository,
    F: SkillFactory,
{
    pub fn new(
        agents: A,
        quotas: Q,
        memory: M,
        runtime: Arc<AgentRuntime<F>>,
        store: Arc<BoxSkillStore>,
    ) -> Self {
        Self {
            agents,
            quotas,
            memory,
            runtime,
            store,
            chat_locks: DashMap::new(),
        }
    }

    /// Handle one message end to end, returning the persisted assistant
    /// reply.
    ///
    /// Quota is consumed before any memory write or model call: a rejected
    /// request leaves no trace beyond the quota check itself.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatMessage, ChatError> {
        let agent = self
            .agents
            .get(&request.agent_id)
            .await?
            .ok_or_else(|| ChatError::AgentNotFound(request.agent_id.to_string()))?;

        let trust = caller_trust(&agent, &request);
        let kind = match request.origin {
            Entrypoint::Autonomous => QuotaKind::AutonomousAction,
            _ => QuotaKind::Message,
        };
        let now = Utc::now();
        let usage = self.quotas.check_and_increment(&agent.id, kind, now).await?;
        info!(
            agent_id = %agent.id,
            origin = %request.origin,
            monthly = usage.monthly.0,
            "request admitted"
        );

        let lock = self
            .chat_locks
            .entry((agent.id.clone(), request.chat_id.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let history = self
            .memory
            .load_recent(&agent.id, &request.chat_id, agent.config.history_token_budget)
            .await?;

        self.memory
            .append(
                &agent.id,
                &request.chat_id,
                NewChatMessage {
                    role: MessageRole::User,
                    content: request.message.clone(),
                    origin: request.origin,
                    author_id: request.user_id.clone(),
                },
            )
            .await?;

        let executor = self.runtime.executor_for(&agent, trust)?;
        let ctx = SkillContext {
            agent_id: agent.id.clone(),
            chat_id: request.chat_id.clone(),
            user_id: request.user_id.clone(),
            entrypoint: request.origin,
            store: self.store.clone(),
        };
        let answer = executor.run(&history, &request.message, &ctx).await?;

        let reply = self
            .memory
            .append(
                &agent.id,
                &request.chat_id,
                NewChatMessage {
                    role: MessageRole::Assistant,
                    content: answer,
                    origin: request.origin,
                    author_id: None,
                },
            )
            .await?;

        // Drop history beyond the budgeted suffix while the chat lock is
        // still held. The reply is already persisted, so a failed prune is
        // logged rather than surfaced to the caller.
        match self
            .memory
            .prune(&agent.id, &request.chat_id, agent.config.history_token_budget)
            .await
        {
            Ok(0) => {}
            Ok(deleted) => {
                info!(agent_id = %agent.id, chat_id = %request.chat_id, deleted, "pruned chat history")
            }
            Err(err) => {
                warn!(agent_id = %agent.id, chat_id = %request.chat_id, error = %err, "history prune failed")
            }
        }
        Ok(reply)
    }
}

/// Internal trust for framework-originated requests and for callers who are
/// the agent's owner; public trust for everyone else.
fn caller_trust(agent: &Agent, request: &ChatRequest) -> CallerTrust {
    if request.origin.is_internal() {
        return CallerTrust::Internal;
    }
    match (&agent.owner, &request.user_id) {
        (Some(owner), Some(user)) if owner == user => CallerTrust::Internal,
        _ => CallerTrust::Public,
    }
}
