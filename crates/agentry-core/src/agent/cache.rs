//! Executor cache and the runtime that assembles executors on demand.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use agentry_types::agent::{Agent, AgentId};
use agentry_types::error::ConfigError;
use agentry_types::skill::CallerTrust;

use super::{AgentExecutor, config_fingerprint};
use crate::llm::BoxLlmProvider;
use crate::skill::{SkillFactory, SkillRegistry};

struct CachedExecutor {
    fingerprint: String,
    executor: Arc<AgentExecutor>,
}

/// Cache of built executors keyed by (agent, trust level).
///
/// The two trust levels load different tool sets, so they cache separately.
/// Invalidation is lazy: entries carry the configuration fingerprint they
/// were built from and are discarded when the stored agent's fingerprint no
/// longer matches.
#[derive(Default)]
pub struct ExecutorCache {
    entries: DashMap<(AgentId, CallerTrust), CachedExecutor>,
}

impl ExecutorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached executor, if one exists and matches `fingerprint`.
    pub fn get_if_fresh(
        &self,
        agent_id: &AgentId,
        trust: CallerTrust,
        fingerprint: &str,
    ) -> Option<Arc<AgentExecutor>> {
        let key = (agent_id.clone(), trust);
        let entry = self.entries.get(&key)?;
        if entry.fingerprint == fingerprint {
            Some(entry.executor.clone())
        } else {
            None
        }
    }

    pub fn insert(
        &self,
        agent_id: AgentId,
        trust: CallerTrust,
        fingerprint: String,
        executor: Arc<AgentExecutor>,
    ) {
        self.entries.insert(
            (agent_id, trust),
            CachedExecutor {
                fingerprint,
                executor,
            },
        );
    }

    /// Drop both trust levels for an agent. Called on update and delete so
    /// the next request observes the new configuration immediately.
    pub fn invalidate(&self, agent_id: &AgentId) {
        self.entries
            .remove(&(agent_id.clone(), CallerTrust::Public));
        self.entries
            .remove(&(agent_id.clone(), CallerTrust::Internal));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Assembles and caches executors for stored agents.
///
/// Shared by every entrypoint; generic over the skill factory the way
/// services are generic over repositories.
pub struct AgentRuntime<F: SkillFactory> {
    registry: SkillRegistry<F>,
    provider: Arc<BoxLlmProvider>,
    cache: ExecutorCache,
}

impl<F: SkillFactory> AgentRuntime<F> {
    pub fn new(factory: F, provider: Arc<BoxLlmProvider>) -> Self {
        Self {
            registry: SkillRegistry::new(factory),
            provider,
            cache: ExecutorCache::new(),
        }
    }

    pub fn registry(&self) -> &SkillRegistry<F> {
        &self.registry
    }

    /// The executor for `agent` at `trust`, rebuilt when the configuration
    /// fingerprint has changed since it was cached.
    pub fn executor_for(
        &self,
        agent: &Agent,
        trust: CallerTrust,
    ) -> Result<Arc<AgentExecutor>, ConfigError> {
        let fingerprint = config_fingerprint(&agent.config);
        if let Some(executor) = self.cache.get_if_fresh(&agent.id, trust, &fingerprint) {
            return Ok(executor);
        }

        let tools = self.registry.tools_for(agent, trust)?;
        debug!(
            agent_id = %agent.id,
            ?trust,
            tools = tools.len(),
            "building executor"
        );
        let executor = Arc::new(AgentExecutor::new(agent, tools, self.provider.clone()));
        self.cache
            .insert(agent.id.clone(), trust, fingerprint, executor.clone());
        Ok(executor)
    }

    /// Drop cached executors for an agent.
    pub fn invalidate(&self, agent_id: &AgentId) {
        self.cache.invalidate(agent_id);
    }
}
