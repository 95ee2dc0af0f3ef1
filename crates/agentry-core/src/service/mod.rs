//! Administrative services over the repository seams.

mod agent;

pub use agent::{AdminError, AgentService};
