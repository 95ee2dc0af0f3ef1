//! MemoryRepository trait definition.

use agentry_types::agent::AgentId;
use agentry_types::chat::{ChatMessage, NewChatMessage};
use agentry_types::error::RepositoryError;

/// Repository trait for append-only conversation memory.
///
/// Messages are keyed (agent, chat, seq); `seq` is assigned by the store and
/// increases monotonically within a chat. Implementations live in
/// agentry-infra (e.g., `SqliteMemoryRepository`).
pub trait MemoryRepository: Send + Sync {
    /// Append a message to a chat, assigning the next `seq`.
    fn append(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        message: NewChatMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Load the chronological suffix of the chat that fits within
    /// `token_budget` approximate tokens. The most recent message is always
    /// included even if it alone exceeds the budget. Returned ASC by seq.
    fn load_recent(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Delete messages older than the suffix `load_recent` would keep.
    /// Idempotent; returns the number of deleted rows.
    fn prune(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete all messages for one chat, or for every chat of the agent when
    /// `chat_id` is None. Returns the number of deleted rows.
    fn clear(
        &self,
        agent_id: &AgentId,
        chat_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Full chat transcript, ASC by seq.
    fn list(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}

impl<T: MemoryRepository> MemoryRepository for std::sync::Arc<T> {
    async fn append(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        message: NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        (**self).append(agent_id, chat_id, message).await
    }

    async fn load_recent(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        (**self).load_recent(agent_id, chat_id, token_budget).await
    }

    async fn prune(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> Result<u64, RepositoryError> {
        (**self).prune(agent_id, chat_id, token_budget).await
    }

    async fn clear(
        &self,
        agent_id: &AgentId,
        chat_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        (**self).clear(agent_id, chat_id).await
    }

    async fn list(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        (**self).list(agent_id, chat_id).await
    }
}
