//! Shared domain types for the Agentry platform.

pub mod agent;
pub mod chat;
pub mod error;
pub mod llm;
pub mod quota;
pub mod skill;
pub mod store;
