//! Repository trait seams implemented by agentry-infra.

mod agent;

pub use agent::AgentRepository;
