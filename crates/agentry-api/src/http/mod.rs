//! REST API surface: routing, handlers, envelope, and error mapping.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
