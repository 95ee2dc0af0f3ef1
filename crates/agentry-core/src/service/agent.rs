//! Agent lifecycle service: create, update, import/export, delete, and
//! memory cleanup.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use agentry_types::agent::{Agent, AgentId, CreateAgentRequest, UpdateAgentRequest};
use agentry_types::error::{ConfigError, RepositoryError};

use crate::agent::AgentRuntime;
use crate::memory::MemoryRepository;
use crate::repository::AgentRepository;
use crate::skill::SkillFactory;

/// Errors from the administrative surface.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("agent '{0}' not found")]
    NotFound(String),

    #[error("agent '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Agent lifecycle operations shared by the HTTP handlers.
///
/// Every write path validates the skills configuration against the registry
/// before persisting, and invalidates cached executors afterwards so the
/// next request observes the new configuration.
pub struct AgentService<A, M, F>
where
    A: AgentRepository,
    M: MemoryRepository,
    F: SkillFactory,
{
    agents: A,
    memory: M,
    runtime: Arc<AgentRuntime<F>>,
}

impl<A, M, F> AgentService<A, M, F>
where
    A: AgentRepository,
    M: MemoryRepository,
    F: SkillFactory,
{
    pub fn new(agents: A, memory: M, runtime: Arc<AgentRuntime<F>>) -> Self {
        Self {
            agents,
            memory,
            runtime,
        }
    }

    /// Create a new agent. Fails on an existing id; `import` is the
    /// replace-allowed path.
    pub async fn create(&self, request: CreateAgentRequest) -> Result<Agent, AdminError> {
        let id = request.id.unwrap_or_else(AgentId::generate);
        if self.agents.get(&id).await?.is_some() {
            return Err(AdminError::AlreadyExists(id.to_string()));
        }
        self.runtime.registry().validate(&request.config.skills)?;

        let now = Utc::now();
        let agent = Agent {
            id: id.clone(),
            name: request.name,
            owner: request.owner,
            config: request.config,
            created_at: now,
            updated_at: now,
        };
        self.agents.upsert(&agent).await?;
        info!(agent_id = %id, "agent created");
        Ok(agent)
    }

    /// Partially update an agent. Absent fields keep their current value.
    pub async fn update(
        &self,
        id: &AgentId,
        request: UpdateAgentRequest,
    ) -> Result<Agent, AdminError> {
        let mut agent = self
            .agents
            .get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(id.to_string()))?;

        if let Some(name) = request.name {
            agent.name = name;
        }
        if let Some(owner) = request.owner {
            agent.owner = Some(owner);
        }
        if let Some(config) = request.config {
            agent.config = config;
        }
        self.runtime.registry().validate(&agent.config.skills)?;

        agent.updated_at = Utc::now();
        self.agents.upsert(&agent).await?;
        self.runtime.invalidate(id);
        info!(agent_id = %id, "agent updated");
        Ok(agent)
    }

    /// Import a full agent document, replacing any existing agent with the
    /// same id. Returns true if the agent was created.
    pub async fn import(&self, mut agent: Agent) -> Result<bool, AdminError> {
        self.runtime.registry().validate(&agent.config.skills)?;
        agent.updated_at = Utc::now();
        let created = self.agents.upsert(&agent).await?;
        self.runtime.invalidate(&agent.id);
        info!(agent_id = %agent.id, created, "agent imported");
        Ok(created)
    }

    /// Export the full agent document.
    pub async fn export(&self, id: &AgentId) -> Result<Agent, AdminError> {
        self.agents
            .get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(id.to_string()))
    }

    pub async fn get(&self, id: &AgentId) -> Result<Agent, AdminError> {
        self.export(id).await
    }

    pub async fn list(&self) -> Result<Vec<Agent>, AdminError> {
        Ok(self.agents.list().await?)
    }

    /// Delete an agent. Quota and skill-store rows cascade in the store;
    /// chat history is left orphaned and reclaimed by memory cleanup.
    pub async fn delete(&self, id: &AgentId) -> Result<(), AdminError> {
        if self.agents.get(id).await?.is_none() {
            return Err(AdminError::NotFound(id.to_string()));
        }
        self.agents.delete(id).await?;
        self.runtime.invalidate(id);
        info!(agent_id = %id, "agent deleted");
        Ok(())
    }

    /// Drop conversation memory for one chat, or all of the agent's chats.
    /// Returns the number of deleted messages.
    pub async fn clear_memory(
        &self,
        id: &AgentId,
        chat_id: Option<&str>,
    ) -> Result<u64, AdminError> {
        if self.agents.get(id).await?.is_none() {
            return Err(AdminError::NotFound(id.to_string()));
        }
        let deleted = self.memory.clear(id, chat_id).await?;
        info!(agent_id = %id, deleted, "memory cleared");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{BoxLlmProvider, LlmProvider};
    use crate::skill::SkillInstance;
    use crate::testsupport::{InMemoryAgents, InMemoryMemory};
    use agentry_types::agent::{AgentConfig, CommonSkillsConfig, SkillsConfig};
    use agentry_types::chat::{Entrypoint, MessageRole, NewChatMessage};
    use agentry_types::llm::{CompletionRequest, CompletionResponse, LlmError};
    use agentry_types::skill::{SkillCategory, SkillState};

    struct NoopProvider;

    impl LlmProvider for NoopProvider {
        fn name(&self) -> &str {
            "noop"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::Transport("noop".into()))
        }
    }

    struct TimeOnlyFactory;

    impl SkillFactory for TimeOnlyFactory {
        fn known_skills(&self, category: SkillCategory) -> &'static [&'static str] {
            match category {
                SkillCategory::Common => &["current_time"],
                _ => &[],
            }
        }

        fn build(
            &self,
            _agent: &Agent,
            _category: SkillCategory,
            _name: &str,
        ) -> Result<SkillInstance, ConfigError> {
            Ok(SkillInstance::Stateless(Arc::new(
                crate::skill::BoxSkill::new(crate::skill::common::CurrentTimeSkill),
            )))
        }
    }

    fn service() -> AgentService<InMemoryAgents, InMemoryMemory, TimeOnlyFactory> {
        AgentService::new(
            InMemoryAgents::default(),
            InMemoryMemory::default(),
            Arc::new(AgentRuntime::new(
                TimeOnlyFactory,
                Arc::new(BoxLlmProvider::new(NoopProvider)),
            )),
        )
    }

    fn create_request(id: Option<&str>) -> CreateAgentRequest {
        CreateAgentRequest {
            id: id.map(|s| AgentId::new(s).unwrap()),
            name: "Admin Test".into(),
            owner: Some("alice".into()),
            config: AgentConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let service = service();
        let created = service.create(create_request(Some("adm-1"))).await.unwrap();
        let fetched = service.get(&created.id).await.unwrap();
        assert_eq!(fetched.name, "Admin Test");
    }

    #[tokio::test]
    async fn test_create_generates_id_when_omitted() {
        let service = service();
        let created = service.create(create_request(None)).await.unwrap();
        assert!(!created.id.as_str().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let service = service();
        service.create(create_request(Some("adm-dup"))).await.unwrap();
        let err = service
            .create(create_request(Some("adm-dup")))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_skill() {
        let service = service();
        let mut request = create_request(Some("adm-bad"));
        request.config.skills = SkillsConfig {
            common: Some(CommonSkillsConfig {
                enabled: true,
                states: [("time_travel".to_string(), SkillState::Public)]
                    .into_iter()
                    .collect(),
            }),
            ..Default::default()
        };
        let err = service.create(request).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Config(ConfigError::UnknownSkill { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_absent_fields() {
        let service = service();
        let created = service.create(create_request(Some("adm-upd"))).await.unwrap();
        let updated = service
            .update(
                &created.id,
                UpdateAgentRequest {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.owner.as_deref(), Some("alice"));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_agent() {
        let service = service();
        let err = service
            .update(
                &AgentId::new("ghost").unwrap(),
                UpdateAgentRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_export_import_roundtrip() {
        let service = service();
        let created = service.create(create_request(Some("adm-exp"))).await.unwrap();
        let mut exported = service.export(&created.id).await.unwrap();

        exported.name = "Reimported".into();
        let created_flag = service.import(exported).await.unwrap();
        assert!(!created_flag);
        assert_eq!(service.get(&created.id).await.unwrap().name, "Reimported");
    }

    #[tokio::test]
    async fn test_delete_then_missing() {
        let service = service();
        let created = service.create(create_request(Some("adm-del"))).await.unwrap();
        service.delete(&created.id).await.unwrap();
        assert!(matches!(
            service.get(&created.id).await.unwrap_err(),
            AdminError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_clear_memory_scoped_to_chat() {
        let service = service();
        let created = service.create(create_request(Some("adm-mem"))).await.unwrap();
        for chat in ["c1", "c2"] {
            service
                .memory
                .append(
                    &created.id,
                    chat,
                    NewChatMessage {
                        role: MessageRole::User,
                        content: "hi".into(),
                        origin: Entrypoint::Api,
                        author_id: None,
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(service.clear_memory(&created.id, Some("c1")).await.unwrap(), 1);
        assert_eq!(service.clear_memory(&created.id, None).await.unwrap(), 1);
    }
}
