use thiserror::Error;

use crate::llm::LlmError;
use crate::quota::QuotaError;
use crate::skill::SkillError;

/// Configuration errors, surfaced at agent create/update time.
///
/// These never reach the reasoning loop: invalid configurations are rejected
/// before they are persisted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid agent id: '{0}' (lowercase letters, digits, and hyphens only)")]
    InvalidAgentId(String),

    #[error("unknown skill '{skill}' in category '{category}'")]
    UnknownSkill { category: String, skill: String },

    #[error("skill category '{category}' requires {field}")]
    MissingCredential {
        category: String,
        field: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from repository/persistence operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Request-level error for the shared chat invocation path.
///
/// Unifies the taxonomy: configuration and quota errors are fatal per
/// request and propagate to the entrypoint unmodified; recoverable skill and
/// timeout errors never surface here because the reasoning loop absorbs
/// them as observations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("agent '{0}' not found")]
    AgentNotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// A fatal (non-recoverable) skill failure.
    #[error(transparent)]
    Skill(#[from] SkillError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{QuotaKind, QuotaWindow};

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownSkill {
            category: "common".into(),
            skill: "time_travel".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown skill 'time_travel' in category 'common'"
        );
    }

    #[test]
    fn test_chat_error_wraps_quota() {
        let err: ChatError = QuotaError::Exceeded {
            kind: QuotaKind::Message,
            window: QuotaWindow::Daily,
            usage: 2,
            limit: 2,
        }
        .into();
        assert!(err.to_string().contains("daily"));
        assert!(err.to_string().contains("2/2"));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
