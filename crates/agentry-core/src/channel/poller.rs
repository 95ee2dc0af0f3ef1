//! Generic sweep loop shared by all polling channels.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use agentry_types::agent::Agent;
use agentry_types::error::{ChatError, RepositoryError};
use agentry_types::store::SkillStoreScope;

use super::{ChannelAdapter, ChannelClient};
use crate::chat::{ChatRequest, ChatService};
use crate::memory::MemoryRepository;
use crate::quota::QuotaRepository;
use crate::repository::AgentRepository;
use crate::skill::{BoxSkillStore, SkillFactory};

/// Best-effort reply sent when a request fails fatally mid-conversation.
const DEGRADED_REPLY: &str =
    "Sorry, something went wrong on my side. Please try again later.";

/// Sweeps one channel for every agent that enables it.
///
/// Sweeps are sequential per agent and per message; the poll cursor lives in
/// the skill store under the channel's entrypoint key and is advanced only
/// after a message has been fully handled, so a crash mid-batch replays the
/// unhandled remainder instead of dropping it.
pub struct ChannelPoller<AD, A, Q, M, F>
where
    AD: ChannelAdapter,
    A: AgentRepository,
    Q: QuotaRepository,
    M: MemoryRepository,
    F: SkillFactory,
{
    adapter: AD,
    agents: A,
    chat: Arc<ChatService<A, Q, M, F>>,
    store: Arc<BoxSkillStore>,
    interval: Duration,
}

impl<AD, A, Q, M, F> ChannelPoller<AD, A, Q, M, F>
where
    AD: ChannelAdapter,
    A: AgentRepository,
    Q: QuotaRepository,
    M: MemoryRepository,
    F: SkillFactory,
{
    pub fn new(
        adapter: AD,
        agents: A,
        chat: Arc<ChatService<A, Q, M, F>>,
        store: Arc<BoxSkillStore>,
        interval: Duration,
    ) -> Self {
        Self {
            adapter,
            agents,
            chat,
            store,
            interval,
        }
    }

    /// Poll until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let entrypoint = self.adapter.entrypoint();
        info!(%entrypoint, interval_secs = self.interval.as_secs(), "channel poller started");
        loop {
            if let Err(err) = self.sweep().await {
                warn!(%entrypoint, error = %err, "sweep failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(%entrypoint, "channel poller stopped");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// One pass over every agent that enables this channel.
    pub async fn sweep(&self) -> Result<(), RepositoryError> {
        for agent in self.agents.list().await? {
            let Some(client) = self.adapter.client_for(&agent) else {
                continue;
            };
            if let Err(err) = self.poll_agent(&agent, &client).await {
                warn!(
                    entrypoint = %self.adapter.entrypoint(),
                    agent_id = %agent.id,
                    error = %err,
                    "agent poll failed"
                );
            }
        }
        Ok(())
    }

    async fn poll_agent(&self, agent: &Agent, client: &AD::Client) -> Result<(), RepositoryError> {
        let entrypoint = self.adapter.entrypoint();
        let skill = format!("{entrypoint}_entrypoint");
        let cursor = self
            .store
            .get(&agent.id, &SkillStoreScope::Agent, &skill, "cursor")
            .await?
            .and_then(|v| {
                v.get("last_id")
                    .and_then(|id| id.as_str())
                    .map(ToString::to_string)
            });

        let inbound = match client.poll(cursor.as_deref()).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(%entrypoint, agent_id = %agent.id, error = %err, "poll failed");
                return Ok(());
            }
        };

        for message in inbound {
            let outcome = self
                .chat
                .handle(ChatRequest {
                    agent_id: agent.id.clone(),
                    chat_id: format!("{entrypoint}:{}", message.chat_id),
                    user_id: Some(message.author_id.clone()),
                    message: message.text.clone(),
                    origin: entrypoint,
                })
                .await;

            let reply = match outcome {
                Ok(turn) => turn.content,
                Err(ChatError::Quota(err)) => {
                    // Leave the cursor in place: the batch replays once a
                    // window resets, without spamming the conversation.
                    info!(%entrypoint, agent_id = %agent.id, error = %err, "quota exhausted, deferring batch");
                    break;
                }
                Err(err) => {
                    warn!(%entrypoint, agent_id = %agent.id, error = %err, "chat failed, degrading");
                    DEGRADED_REPLY.to_string()
                }
            };

            if let Err(err) = client.reply(&message.chat_id, &reply).await {
                warn!(%entrypoint, agent_id = %agent.id, error = %err, "reply failed, stopping batch");
                break;
            }
            self.store
                .set(
                    &agent.id,
                    &SkillStoreScope::Agent,
                    &skill,
                    "cursor",
                    &json!({ "last_id": message.id }),
                )
                .await?;
        }
        Ok(())
    }
}
