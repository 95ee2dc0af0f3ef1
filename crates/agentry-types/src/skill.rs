use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::RepositoryError;

/// Visibility state of a single skill within an agent's configuration.
///
/// - `Disabled`: never loaded, regardless of caller.
/// - `Public`: usable by any caller, including untrusted end users.
/// - `Private`: usable only by the agent owner or internal callers
///   (autonomous scheduler, channel pollers acting for the owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillState {
    Disabled,
    Public,
    Private,
}

impl SkillState {
    /// Whether a skill in this state is loaded for the given caller.
    pub fn allows(self, trust: CallerTrust) -> bool {
        match self {
            SkillState::Disabled => false,
            SkillState::Public => true,
            SkillState::Private => trust == CallerTrust::Internal,
        }
    }
}

impl fmt::Display for SkillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillState::Disabled => write!(f, "disabled"),
            SkillState::Public => write!(f, "public"),
            SkillState::Private => write!(f, "private"),
        }
    }
}

impl FromStr for SkillState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(SkillState::Disabled),
            "public" => Ok(SkillState::Public),
            "private" => Ok(SkillState::Private),
            other => Err(format!("invalid skill state: '{other}'")),
        }
    }
}

/// Whether the current call comes from the trusted/internal path.
///
/// `Internal` covers the agent owner and framework-originated runs
/// (autonomous scheduler, pollers); `Public` is any other caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerTrust {
    Public,
    Internal,
}

/// The closed set of skill categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Common,
    Web,
    Market,
    Twitter,
    Telegram,
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillCategory::Common => write!(f, "common"),
            SkillCategory::Web => write!(f, "web"),
            SkillCategory::Market => write!(f, "market"),
            SkillCategory::Twitter => write!(f, "twitter"),
            SkillCategory::Telegram => write!(f, "telegram"),
        }
    }
}

/// The machine-readable description of a skill advertised to the LLM:
/// name, what it does, and a JSON Schema for its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the argument shape.
    pub parameters: serde_json::Value,
}

/// Errors raised by skill invocation.
///
/// Recoverable variants are surfaced to the reasoning loop as observations
/// so the model can adapt; fatal variants abort the whole request.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Upstream API or execution failure. Recoverable.
    #[error("skill execution failed: {0}")]
    Execution(String),

    /// Outbound call exceeded its timeout. Recoverable.
    #[error("skill call timed out after {0}s")]
    Timeout(u64),

    /// Malformed arguments from the model. Recoverable (the model can retry
    /// with corrected arguments).
    #[error("invalid skill arguments: {0}")]
    InvalidArguments(String),

    /// Missing or rejected credentials. Fatal.
    #[error("skill credential error: {0}")]
    Credential(String),

    /// Skill-store persistence failure. Fatal.
    #[error("skill store error: {0}")]
    Store(#[from] RepositoryError),
}

impl SkillError {
    /// Whether the reasoning loop may continue after observing this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SkillError::Execution(_) | SkillError::Timeout(_) | SkillError::InvalidArguments(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_allows() {
        assert!(!SkillState::Disabled.allows(CallerTrust::Public));
        assert!(!SkillState::Disabled.allows(CallerTrust::Internal));
    }

    #[test]
    fn test_public_allows_everyone() {
        assert!(SkillState::Public.allows(CallerTrust::Public));
        assert!(SkillState::Public.allows(CallerTrust::Internal));
    }

    #[test]
    fn test_private_allows_internal_only() {
        assert!(!SkillState::Private.allows(CallerTrust::Public));
        assert!(SkillState::Private.allows(CallerTrust::Internal));
    }

    #[test]
    fn test_skill_state_roundtrip() {
        for state in [SkillState::Disabled, SkillState::Public, SkillState::Private] {
            let s = state.to_string();
            let parsed: SkillState = s.parse().unwrap();
            assert_eq!(state, parsed);
        }
    }

    #[test]
    fn test_skill_error_recoverability() {
        assert!(SkillError::Execution("api 500".into()).is_recoverable());
        assert!(SkillError::Timeout(30).is_recoverable());
        assert!(SkillError::InvalidArguments("bad json".into()).is_recoverable());
        assert!(!SkillError::Credential("no token".into()).is_recoverable());
        assert!(!SkillError::Store(RepositoryError::Connection).is_recoverable());
    }
}
