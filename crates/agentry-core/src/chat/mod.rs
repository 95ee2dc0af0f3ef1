//! The shared chat invocation path every entrypoint funnels through.

mod service;

pub use service::{ChatRequest, ChatService};
