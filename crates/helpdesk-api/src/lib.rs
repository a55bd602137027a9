//! Helpdesk API crate - axum HTTP server and route handlers.
//!
//! Exposes ticket search, classification and ticket intake over JSON, plus
//! health and taxonomy introspection.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
