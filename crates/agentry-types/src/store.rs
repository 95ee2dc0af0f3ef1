use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::AgentId;

/// Scope of a skill-store entry.
///
/// This is the only persistent-state mechanism available to skills: a JSON
/// document keyed by scope + (skill, key). Entries are owned by the skill
/// category that writes them and are cascade-deleted with the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SkillStoreScope {
    /// Shared across all of the agent's threads and users.
    Agent,
    /// Scoped to one chat/thread.
    Thread { chat_id: String },
    /// Scoped to one external user of the agent.
    AgentUser { user_id: String },
}

impl SkillStoreScope {
    /// Discriminant used as the `scope` column.
    pub fn kind(&self) -> &'static str {
        match self {
            SkillStoreScope::Agent => "agent",
            SkillStoreScope::Thread { .. } => "thread",
            SkillStoreScope::AgentUser { .. } => "agent_user",
        }
    }

    /// Secondary key within the scope ("" for agent scope).
    pub fn key(&self) -> &str {
        match self {
            SkillStoreScope::Agent => "",
            SkillStoreScope::Thread { chat_id } => chat_id,
            SkillStoreScope::AgentUser { user_id } => user_id,
        }
    }
}

impl fmt::Display for SkillStoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillStoreScope::Agent => write!(f, "agent"),
            SkillStoreScope::Thread { chat_id } => write!(f, "thread:{chat_id}"),
            SkillStoreScope::AgentUser { user_id } => write!(f, "agent_user:{user_id}"),
        }
    }
}

/// A stored skill-state document with its timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillStoreEntry {
    pub agent_id: AgentId,
    pub scope: SkillStoreScope,
    pub skill: String,
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
