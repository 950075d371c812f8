//! HTTP boundary for the grocery assistant.
//!
//! Exposes the conversation over a small JSON API built on axum.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use routes::{create_router, start_server};
pub use state::AppState;
