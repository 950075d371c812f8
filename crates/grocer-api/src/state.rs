//! Application state shared across all route handlers.
//!
//! Passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use grocer_catalog::CatalogStore;
use grocer_chat::{QueryOracle, SessionOrchestrator};
use grocer_core::config::{ApiConfig, GrocerConfig};

/// Shared application state.
///
/// All fields are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// The single conversation served by this process.
    pub orchestrator: Arc<SessionOrchestrator>,
    /// HTTP-layer settings (CORS, rate limit, body size).
    pub api: ApiConfig,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<SessionOrchestrator>, api: ApiConfig) -> Self {
        Self {
            orchestrator,
            api,
            start_time: Instant::now(),
        }
    }

    /// Build the orchestrator from config and wrap it in fresh state.
    pub fn from_config(
        config: &GrocerConfig,
        catalog: CatalogStore,
        oracle: Arc<dyn QueryOracle>,
    ) -> Self {
        let orchestrator =
            SessionOrchestrator::new(config.chat.clone(), Arc::new(catalog), oracle);
        Self::new(Arc::new(orchestrator), config.api.clone())
    }
}
