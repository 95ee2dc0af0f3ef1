//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use agentry_core::service::AdminError;
use agentry_types::error::{ChatError, ConfigError, RepositoryError};
use agentry_types::quota::QuotaError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the shared chat path.
    Chat(ChatError),
    /// Errors from the administrative surface.
    Admin(AdminError),
    /// Request validation failure.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        AppError::Admin(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Admin(AdminError::Config(e))
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Admin(AdminError::Repository(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Chat(ChatError::AgentNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "AGENT_NOT_FOUND",
                format!("Agent '{id}' not found"),
            ),
            AppError::Chat(ChatError::Quota(err @ QuotaError::Exceeded { .. })) => {
                (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED", err.to_string())
            }
            AppError::Chat(ChatError::Quota(QuotaError::Repository(e))) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR", e.to_string())
            }
            AppError::Chat(ChatError::Config(e)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Chat(ChatError::Llm(e)) => {
                (StatusCode::BAD_GATEWAY, "LLM_ERROR", e.to_string())
            }
            AppError::Chat(ChatError::Skill(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SKILL_ERROR", e.to_string())
            }
            AppError::Chat(ChatError::Repository(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR", e.to_string())
            }
            AppError::Admin(AdminError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "AGENT_NOT_FOUND",
                format!("Agent '{id}' not found"),
            ),
            AppError::Admin(AdminError::AlreadyExists(id)) => (
                StatusCode::CONFLICT,
                "AGENT_EXISTS",
                format!("Agent '{id}' already exists"),
            ),
            AppError::Admin(AdminError::Config(e)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Admin(AdminError::Repository(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR", e.to_string())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
