//! In-memory repository implementations for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use agentry_types::agent::{Agent, AgentId};
use agentry_types::chat::{ChatMessage, NewChatMessage};
use agentry_types::error::RepositoryError;
use agentry_types::quota::{QuotaError, QuotaKind, QuotaLimits, QuotaRecord, QuotaUsage};

use agentry_types::store::{SkillStoreEntry, SkillStoreScope};

use crate::memory::tokens::take_recent_within_budget;
use crate::memory::MemoryRepository;
use crate::quota::QuotaRepository;
use crate::repository::AgentRepository;
use crate::skill::SkillStore;

#[derive(Default)]
pub struct InMemoryAgents {
    agents: Mutex<HashMap<AgentId, Agent>>,
}

impl InMemoryAgents {
    pub fn put(&self, agent: Agent) {
        self.agents.lock().unwrap().insert(agent.id.clone(), agent);
    }
}

impl AgentRepository for InMemoryAgents {
    async fn get(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.agents.lock().unwrap().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        let mut agents: Vec<_> = self.agents.lock().unwrap().values().cloned().collect();
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(agents)
    }

    async fn upsert(&self, agent: &Agent) -> Result<bool, RepositoryError> {
        Ok(self
            .agents
            .lock()
            .unwrap()
            .insert(agent.id.clone(), agent.clone())
            .is_none())
    }

    async fn delete(&self, id: &AgentId) -> Result<(), RepositoryError> {
        self.agents.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuotas {
    records: Mutex<HashMap<AgentId, QuotaRecord>>,
}

impl InMemoryQuotas {
    pub fn set_limits_sync(&self, id: &AgentId, limits: &QuotaLimits, now: DateTime<Utc>) {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(id.clone())
            .or_insert_with(|| QuotaRecord::new(id.clone(), now));
        record.set_limits(limits, now);
    }

    pub fn record(&self, id: &AgentId) -> Option<QuotaRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }
}

impl QuotaRepository for InMemoryQuotas {
    async fn get_or_create(
        &self,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        Ok(records
            .entry(agent_id.clone())
            .or_insert_with(|| QuotaRecord::new(agent_id.clone(), now))
            .clone())
    }

    async fn check_and_increment(
        &self,
        agent_id: &AgentId,
        kind: QuotaKind,
        now: DateTime<Utc>,
    ) -> Result<QuotaUsage, QuotaError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(agent_id.clone())
            .or_insert_with(|| QuotaRecord::new(agent_id.clone(), now));
        record.reset_expired_windows(now);
        if let Some((window, usage, limit)) = record.exhausted_window(kind) {
            return Err(QuotaError::Exceeded {
                kind,
                window,
                usage,
                limit,
            });
        }
        record.apply(kind, now);
        Ok(record.usage(kind))
    }

    async fn set_limits(
        &self,
        agent_id: &AgentId,
        limits: &QuotaLimits,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, RepositoryError> {
        self.set_limits_sync(agent_id, limits, now);
        self.record(agent_id).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub struct InMemoryMemory {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryMemory {
    fn chat_desc(&self, agent_id: &AgentId, chat_id: &str) -> Vec<ChatMessage> {
        let mut chat: Vec<_> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.agent_id == agent_id && m.chat_id == chat_id)
            .cloned()
            .collect();
        chat.sort_by(|a, b| b.seq.cmp(&a.seq));
        chat
    }
}

impl MemoryRepository for InMemoryMemory {
    async fn append(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        message: NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.lock().unwrap();
        let seq = messages
            .iter()
            .filter(|m| &m.agent_id == agent_id && m.chat_id == chat_id)
            .map(|m| m.seq)
            .max()
            .unwrap_or(0)
            + 1;
        let stored = ChatMessage {
            agent_id: agent_id.clone(),
            chat_id: chat_id.to_string(),
            seq,
            role: message.role,
            content: message.content,
            origin: message.origin,
            author_id: message.author_id,
            created_at: Utc::now(),
        };
        messages.push(stored.clone());
        Ok(stored)
    }

    async fn load_recent(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(take_recent_within_budget(
            self.chat_desc(agent_id, chat_id),
            token_budget,
        ))
    }

    async fn prune(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
        token_budget: u32,
    ) -> Result<u64, RepositoryError> {
        let kept = take_recent_within_budget(self.chat_desc(agent_id, chat_id), token_budget);
        let cutoff = kept.first().map(|m| m.seq).unwrap_or(i64::MAX);
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| {
            !(&m.agent_id == agent_id && m.chat_id == chat_id && m.seq < cutoff)
        });
        Ok((before - messages.len()) as u64)
    }

    async fn clear(
        &self,
        agent_id: &AgentId,
        chat_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| {
            !(&m.agent_id == agent_id && chat_id.is_none_or(|c| m.chat_id == c))
        });
        Ok((before - messages.len()) as u64)
    }

    async fn list(
        &self,
        agent_id: &AgentId,
        chat_id: &str,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut chat = self.chat_desc(agent_id, chat_id);
        chat.reverse();
        Ok(chat)
    }
}

type StoreKey = (AgentId, &'static str, String, String, String);

#[derive(Default)]
pub struct InMemorySkillStore {
    entries: Mutex<HashMap<StoreKey, serde_json::Value>>,
}

fn store_key(
    agent_id: &AgentId,
    scope: &SkillStoreScope,
    skill: &str,
    key: &str,
) -> StoreKey {
    (
        agent_id.clone(),
        scope.kind(),
        scope.key().to_string(),
        skill.to_string(),
        key.to_string(),
    )
}

impl SkillStore for InMemorySkillStore {
    async fn get(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&store_key(agent_id, scope, skill, key))
            .cloned())
    }

    async fn set(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .unwrap()
            .insert(store_key(agent_id, scope, skill, key), value.clone());
        Ok(())
    }

    async fn delete(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
        key: &str,
    ) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .unwrap()
            .remove(&store_key(agent_id, scope, skill, key));
        Ok(())
    }

    async fn list(
        &self,
        agent_id: &AgentId,
        scope: &SkillStoreScope,
        skill: &str,
    ) -> Result<Vec<SkillStoreEntry>, RepositoryError> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|((id, kind, key, s, _), _)| {
                id == agent_id && *kind == scope.kind() && key == scope.key() && s == skill
            })
            .map(|((id, _, _, s, k), v)| SkillStoreEntry {
                agent_id: id.clone(),
                scope: scope.clone(),
                skill: s.clone(),
                key: k.clone(),
                value: v.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect())
    }
}
