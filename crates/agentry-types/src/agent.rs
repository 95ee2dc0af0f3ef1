use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::skill::SkillState;

/// Unique identifier for an agent: a URL-safe lowercase slug.
///
/// Ids are chosen by the caller at create time ("ex1", "my-trader") or
/// generated from a UUID v7 when omitted. Keeping them human-readable makes
/// them usable directly in chat routes and log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Validate and wrap an id. Only lowercase letters, digits, and hyphens
    /// are accepted; length 1..=64.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.is_empty() || id.len() > 64 {
            return Err(ConfigError::InvalidAgentId(id));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::InvalidAgentId(id));
        }
        Ok(Self(id))
    }

    /// Generate a fresh id from a time-sortable UUID v7.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AgentId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AgentId {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> String {
        id.0
    }
}

/// A configured agent persona addressable by external callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Display name, shown to end users and injected into the system prompt.
    pub name: String,
    /// Owner identifier used for access control: callers matching the owner
    /// get the trusted (private) skill set.
    pub owner: Option<String>,
    /// The mutable configuration covered by the executor-cache fingerprint.
    pub config: AgentConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutable configuration of an agent.
///
/// Every field here participates in the executor-cache fingerprint: changing
/// any of them causes the next request to rebuild the cached executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier passed through to the LLM provider.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature (0.0..=1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    /// Base system prompt defining behavior.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Additional system prompt appended after the base prompt.
    #[serde(default)]
    pub prompt_append: Option<String>,
    /// Autonomous-mode settings.
    #[serde(default)]
    pub autonomous: AutonomousConfig,
    /// Per-category skill configuration.
    #[serde(default)]
    pub skills: SkillsConfig,
    /// Token budget for conversation history loaded into each request.
    #[serde(default = "default_history_token_budget")]
    pub history_token_budget: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_history_token_budget() -> u32 {
    4096
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            prompt: None,
            prompt_append: None,
            autonomous: AutonomousConfig::default(),
            skills: SkillsConfig::default(),
            history_token_budget: default_history_token_budget(),
        }
    }
}

/// Autonomous-mode settings: when enabled, the scheduler runs the agent on
/// its own interval with the configured prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Interval in minutes between autonomous runs.
    #[serde(default = "default_autonomous_minutes")]
    pub minutes: u32,
    /// Prompt used as the input of each autonomous run.
    #[serde(default)]
    pub prompt: Option<String>,
}

fn default_autonomous_minutes() -> u32 {
    240
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            minutes: default_autonomous_minutes(),
            prompt: None,
        }
    }
}

/// Per-category skill configuration, composed as a struct of optional
/// category variants. Each category validates its own schema through serde;
/// unknown skill names inside a category are rejected by the registry at
/// agent create/update time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common: Option<CommonSkillsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSkillsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketSkillsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<TwitterSkillsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramSkillsConfig>,
}

/// Skills that need no credentials or configuration beyond their states.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommonSkillsConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Per-skill visibility states.
    #[serde(default)]
    pub states: BTreeMap<String, SkillState>,
}

/// Generic web-access skills (URL fetching).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebSkillsConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub states: BTreeMap<String, SkillState>,
}

/// Market-data skills (token price lookups).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketSkillsConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub states: BTreeMap<String, SkillState>,
    /// Optional API key for the upstream price API (opaque, wrapped in
    /// `secrecy::SecretString` when the client is constructed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Twitter integration: skills plus the mention-poller entrypoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwitterSkillsConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub states: BTreeMap<String, SkillState>,
    /// Whether the mention poller watches this agent.
    #[serde(default)]
    pub entrypoint_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

/// Telegram integration: poller entrypoint credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramSkillsConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub states: BTreeMap<String, SkillState>,
    #[serde(default)]
    pub entrypoint_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

fn enabled_default() -> bool {
    true
}

/// Request body for agent create/import. `id` may be omitted to generate one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AgentId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub config: AgentConfig,
}

/// Request body for agent update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AgentConfig>,
}
