//! LlmProvider trait definition.

use agentry_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// A chat-completion backend with tool calling.
///
/// Implementations live in agentry-infra (e.g., `OpenAiCompatProvider`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition); see
/// [`super::BoxLlmProvider`] for the type-erased form.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name, used in log lines.
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
