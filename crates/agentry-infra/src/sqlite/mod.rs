//! SQLite-backed repository implementations.

mod agent;
mod memory;
mod pool;
mod quota;
mod skill_store;

pub use agent::SqliteAgentRepository;
pub use memory::SqliteMemoryRepository;
pub use pool::{DatabasePool, default_database_url};
pub use quota::SqliteQuotaRepository;
pub use skill_store::SqliteSkillStore;
