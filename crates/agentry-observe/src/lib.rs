//! Tracing subscriber initialization for the Agentry runtime.

pub mod tracing_setup;
