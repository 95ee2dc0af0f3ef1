//! LLM provider seam.

mod box_provider;
mod provider;

pub use box_provider::{BoxLlmProvider, LlmProviderDyn};
pub use provider::LlmProvider;
