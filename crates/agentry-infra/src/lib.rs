//! Agentry infrastructure: SQLite persistence, the OpenAI-compatible LLM
//! client, HTTP-backed skills, and channel clients.
//!
//! Everything here implements a trait seam from agentry-core; nothing in
//! this crate is reachable except through those seams.

pub mod channel;
pub mod config;
pub mod llm;
pub mod skill;
pub mod sqlite;
