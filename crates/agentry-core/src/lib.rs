//! Agentry core: business logic and trait seams.
//!
//! This crate holds the executor, skill registry, quota and memory
//! contracts, the shared chat path, and the entrypoint drivers (channel
//! pollers, autonomous scheduler). It never touches a database or the
//! network directly; persistence and clients live in agentry-infra behind
//! the repository and provider traits defined here.

pub mod agent;
pub mod autonomous;
pub mod channel;
pub mod chat;
pub mod llm;
pub mod memory;
pub mod quota;
pub mod repository;
pub mod service;
pub mod skill;

#[cfg(test)]
pub(crate) mod testsupport;
