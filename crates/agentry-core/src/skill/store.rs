//! SkillStore trait definition and its object-safe wrapper.

use std::future::Future;
use std::pin::Pin;

use agentry_types::agent::AgentId;
use agentry_types::error::RepositoryError;
use agentry_types::store::{SkillStoreEntry, SkillStoreScope};

/// Scoped key/value persistence for skills and entrypoints.
///
/// Implementations live in agentry-infra (e.g., `SqliteSkillStore`).
pub trait SkillStore: Send + Sync {
    fn get(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send;

    /// Insert or replace the value for (agent, scope, skill, key).
    fn set(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete one entry. Missing entries are not an error.
    fn delete(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// List all entries of one skill within a scope.
    fn list(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
    ) -> impl Future<Output = Result<Vec<SkillStoreEntry>, RepositoryError>> + Send;
}

/// Object-safe version of [`SkillStore`] with boxed futures.
pub trait SkillStoreDyn: Send + Sync {
    fn get_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send + 'a>>;

    fn set_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
        key: &'a str,
        value: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>>;

    fn delete_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>>;

    fn list_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SkillStoreEntry>, RepositoryError>> + Send + 'a>>;
}

impl<T: SkillStore> SkillStoreDyn for T {
    fn get_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send + 'a>>
    {
        Box::pin(self.get(agent_id, scope, skill, key))
    }

    fn set_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
        key: &'a str,
        value: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>> {
        Box::pin(self.set(agent_id, scope, skill, key, value))
    }

    fn delete_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>> {
        Box::pin(self.delete(agent_id, scope, skill, key))
    }

    fn list_boxed<'a>(
        &'a self,
        agent_id: &'a AgentId,
        scope: &'a SkillStoreScope,
        skill: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SkillStoreEntry>, RepositoryError>> + Send + 'a>>
    {
        Box::pin(self.list(agent_id, scope, skill))
    }
}

/// Type-erased skill store shared by every skill call and entrypoint cursor.
pub struct BoxSkillStore {
    inner: Box<dyn SkillStoreDyn + Send + Sync>,
}

impl BoxSkillStore {
    /// Wrap a concrete `SkillStore` in a type-erased box.
    pub fn new<T: SkillStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn get(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        self.inner.get_boxed(agent_id, scope, skill, key).await
    }

    pub async fn set(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        self.inner
            .set_boxed(agent_id, scope, skill, key, value)
            .await
    }

    pub async fn delete(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> Result<(), RepositoryError> {
        self.inner.delete_boxed(agent_id, scope, skill, key).await
    }

    pub async fn list(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
    ) -> Result<Vec<SkillStoreEntry>, RepositoryError> {
        self.inner.list_boxed(agent_id, scope, skill).await
    }
}
