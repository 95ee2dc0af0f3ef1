//! AgentRepository trait definition.

use agentry_types::agent::{Agent, AgentId};
use agentry_types::error::RepositoryError;

/// Repository trait for agent persistence.
///
/// Implementations live in agentry-infra (e.g., `SqliteAgentRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait AgentRepository: Send + Sync {
    /// Get an agent by id.
    fn get(
        &self,
        id: &AgentId,
    ) -> impl std::future::Future<Output = Result<Option<Agent>, RepositoryError>> + Send;

    /// List all agents, ordered by created_at ASC.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Agent>, RepositoryError>> + Send;

    /// Insert or replace an agent. Returns true if the agent was created,
    /// false if an existing row was updated.
    fn upsert(
        &self,
        agent: &Agent,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete an agent. Quota and skill-store rows cascade; chat history is
    /// left orphaned by design.
    fn delete(
        &self,
        id: &AgentId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

impl<T: AgentRepository> AgentRepository for std::sync::Arc<T> {
    async fn get(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        (**self).list().await
    }

    async fn upsert(&self, agent: &Agent) -> Result<bool, RepositoryError> {
        (**self).upsert(agent).await
    }

    async fn delete(&self, id: &AgentId) -> Result<(), RepositoryError> {
        (**self).delete(id).await
    }
}
