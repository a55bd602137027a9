//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use helpdesk_core::config::HelpdeskConfig;
use helpdesk_vector::TicketSearchEngine;

/// Shared application state.
///
/// The engine sits behind one async mutex: a search that rebuilds the index
/// and a concurrent add never interleave.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (read-only after startup).
    pub config: Arc<HelpdeskConfig>,
    /// The search and classification engine.
    pub engine: Arc<Mutex<TicketSearchEngine>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: HelpdeskConfig, engine: TicketSearchEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(Mutex::new(engine)),
            start_time: Instant::now(),
        }
    }
}
