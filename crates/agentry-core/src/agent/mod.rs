//! Agent executor assembly: prompt composition, config fingerprinting,
//! the reasoning loop, and the per-agent executor cache.

mod cache;
mod executor;
mod fingerprint;
mod prompt;

pub use cache::{AgentRuntime, ExecutorCache};
pub use executor::AgentExecutor;
pub use fingerprint::config_fingerprint;
pub use prompt::compose_system_prompt;
