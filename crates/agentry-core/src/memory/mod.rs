//! Conversation memory: repository seam and token-budget selection.

mod store;
pub mod tokens;

pub use store::MemoryRepository;
