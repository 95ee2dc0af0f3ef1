use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::agent::AgentId;

/// One turn of a conversation, keyed by (agent, chat, seq).
///
/// Append-only: `seq` increases monotonically within a chat and messages are
/// never edited. Pruning removes the oldest turns only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub agent_id: AgentId,
    pub chat_id: String,
    pub seq: i64,
    pub role: MessageRole,
    pub content: String,
    /// Which entrypoint produced this turn.
    pub origin: Entrypoint,
    /// External author identifier (user id, tweet author, telegram sender).
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A message to append; the store assigns `seq` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub origin: Entrypoint,
    pub author_id: Option<String>,
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// The external-facing channel a request arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entrypoint {
    Api,
    Twitter,
    Telegram,
    Autonomous,
}

impl Entrypoint {
    /// Framework-originated entrypoints run with internal trust.
    pub fn is_internal(self) -> bool {
        matches!(self, Entrypoint::Autonomous)
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entrypoint::Api => write!(f, "api"),
            Entrypoint::Twitter => write!(f, "twitter"),
            Entrypoint::Telegram => write!(f, "telegram"),
            Entrypoint::Autonomous => write!(f, "autonomous"),
        }
    }
}

impl FromStr for Entrypoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Entrypoint::Api),
            "twitter" => Ok(Entrypoint::Twitter),
            "telegram" => Ok(Entrypoint::Telegram),
            "autonomous" => Ok(Entrypoint::Autonomous),
            other => Err(format!("invalid entrypoint: '{other}'")),
        }
    }
}
