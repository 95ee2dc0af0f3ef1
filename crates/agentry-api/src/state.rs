//! Application state wiring all services together.
//!
//! The services are generic over repository and factory traits; AppState
//! pins them to the concrete infra implementations.

use std::sync::Arc;

use secrecy::SecretString;

use agentry_core::agent::AgentRuntime;
use agentry_core::chat::ChatService;
use agentry_core::llm::BoxLlmProvider;
use agentry_core::service::AgentService;
use agentry_core::skill::BoxSkillStore;
use agentry_infra::config::{self, Settings};
use agentry_infra::llm::OpenAiCompatProvider;
use agentry_infra::skill::DefaultSkillFactory;
use agentry_infra::sqlite::{
    DatabasePool, SqliteAgentRepository, SqliteMemoryRepository, SqliteQuotaRepository,
    SqliteSkillStore, default_database_url,
};

/// Concrete type aliases for the service generics pinned to infra
/// implementations. Repositories are shared behind `Arc` because the HTTP
/// handlers, pollers, and scheduler all hold the same instances.
pub type ConcreteChatService = ChatService<
    Arc<SqliteAgentRepository>,
    Arc<SqliteQuotaRepository>,
    Arc<SqliteMemoryRepository>,
    DefaultSkillFactory,
>;

pub type ConcreteAgentService =
    AgentService<Arc<SqliteAgentRepository>, Arc<SqliteMemoryRepository>, DefaultSkillFactory>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub agents: Arc<SqliteAgentRepository>,
    pub quotas: Arc<SqliteQuotaRepository>,
    pub memory: Arc<SqliteMemoryRepository>,
    pub store: Arc<BoxSkillStore>,
    pub chat_service: Arc<ConcreteChatService>,
    pub agent_service: Arc<ConcreteAgentService>,
    pub settings: Settings,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the database, build the
    /// LLM provider and skill factory, wire the services.
    pub async fn init(settings: Settings) -> anyhow::Result<Self> {
        let data_dir = config::data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = settings
            .database_url
            .clone()
            .unwrap_or_else(default_database_url);
        let db_pool = DatabasePool::new(&db_url).await?;

        let agents = Arc::new(SqliteAgentRepository::new(db_pool.clone()));
        let quotas = Arc::new(SqliteQuotaRepository::new(db_pool.clone()));
        let memory = Arc::new(SqliteMemoryRepository::new(db_pool.clone()));
        let store = Arc::new(BoxSkillStore::new(SqliteSkillStore::new(db_pool.clone())));

        let api_key = match config::llm_api_key() {
            Some(key) => key,
            None => {
                tracing::warn!("no LLM API key in environment, completions will fail");
                SecretString::from("")
            }
        };
        let provider = OpenAiCompatProvider::new(
            settings.llm.provider.clone(),
            settings.llm.base_url.clone(),
            api_key,
            settings.llm.timeout_secs,
        )?;
        let runtime = Arc::new(AgentRuntime::new(
            DefaultSkillFactory::new()?,
            Arc::new(BoxLlmProvider::new(provider)),
        ));

        let chat_service = Arc::new(ChatService::new(
            agents.clone(),
            quotas.clone(),
            memory.clone(),
            runtime.clone(),
            store.clone(),
        ));
        let agent_service = Arc::new(AgentService::new(
            agents.clone(),
            memory.clone(),
            runtime,
        ));

        Ok(Self {
            agents,
            quotas,
            memory,
            store,
            chat_service,
            agent_service,
            settings,
            db_pool,
        })
    }
}
