//! REST API handlers.

pub mod agent;
pub mod chat;
pub mod quota;
