//! Skill trait, type-erased wrappers, and the per-agent registry.

pub mod common;
mod registry;
mod store;

pub use registry::{SkillFactory, SkillInstance, SkillRegistry};
pub use store::{BoxSkillStore, SkillStore, SkillStoreDyn};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use agentry_types::agent::AgentId;
use agentry_types::chat::Entrypoint;
use agentry_types::skill::{SkillCategory, SkillError, ToolSpec};

/// Per-request context handed to every skill call.
#[derive(Clone)]
pub struct SkillContext {
    pub agent_id: AgentId,
    pub chat_id: String,
    /// External caller identifier, when the entrypoint knows one.
    pub user_id: Option<String>,
    pub entrypoint: Entrypoint,
    /// Scoped persistent state shared by all skills of the agent.
    pub store: Arc<BoxSkillStore>,
}

/// A callable capability advertised to the LLM as a tool.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition); see
/// [`BoxSkill`] for the type-erased form the executor holds.
pub trait Skill: Send + Sync {
    /// Tool name, unique across all categories.
    fn name(&self) -> &str;

    fn category(&self) -> SkillCategory;

    /// The spec advertised to the model.
    fn spec(&self) -> ToolSpec;

    /// Execute with parsed JSON arguments.
    fn call(
        &self,
        ctx: &SkillContext,
        args: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, SkillError>> + Send;
}

/// Object-safe version of [`Skill`] with boxed futures.
pub trait SkillDyn: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> SkillCategory;

    fn spec(&self) -> ToolSpec;

    fn call_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SkillError>> + Send + 'a>>;
}

impl<T: Skill> SkillDyn for T {
    fn name(&self) -> &str {
        Skill::name(self)
    }

    fn category(&self) -> SkillCategory {
        Skill::category(self)
    }

    fn spec(&self) -> ToolSpec {
        Skill::spec(self)
    }

    fn call_boxed<'a>(
        &'a self,
        ctx: &'a SkillContext,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SkillError>> + Send + 'a>> {
        Box::pin(self.call(ctx, args))
    }
}

/// Type-erased skill, so executors can hold a heterogeneous tool set.
pub struct BoxSkill {
    inner: Box<dyn SkillDyn + Send + Sync>,
}

impl BoxSkill {
    /// Wrap a concrete `Skill` in a type-erased box.
    pub fn new<T: Skill + 'static>(skill: T) -> Self {
        Self {
            inner: Box::new(skill),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn category(&self) -> SkillCategory {
        self.inner.category()
    }

    pub fn spec(&self) -> ToolSpec {
        self.inner.spec()
    }

    pub async fn call(
        &self,
        ctx: &SkillContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, SkillError> {
        self.inner.call_boxed(ctx, args).await
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use agentry_types::error::RepositoryError;
    use agentry_types::store::{SkillStoreEntry, SkillStoreScope};

    pub struct NullStore;

    impl SkillStore for NullStore {
        async fn get(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
            _key: &str,
        ) -> Result<Option<serde_json::Value>, RepositoryError> {
            Ok(None)
        }

        async fn set(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
            _key: &str,
            _value: &serde_json::Value,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
            _key: &str,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn list(
            &self,
            _agent_id: &AgentId,
            _scope: &SkillStoreScope,
            _skill: &str,
        ) -> Result<Vec<SkillStoreEntry>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    /// A context wired to a no-op store, for tests that never touch it.
    pub fn null_ctx(agent: &str) -> SkillContext {
        SkillContext {
            agent_id: AgentId::new(agent).unwrap(),
            chat_id: "test-chat".into(),
            user_id: None,
            entrypoint: Entrypoint::Api,
            store: Arc::new(BoxSkillStore::new(NullStore)),
        }
    }
}
