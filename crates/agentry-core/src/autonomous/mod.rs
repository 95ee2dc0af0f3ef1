//! Autonomous scheduling: per-agent interval runs through the shared chat
//! path.

mod scheduler;

pub use scheduler::{AutonomousScheduler, TaskSpec};
