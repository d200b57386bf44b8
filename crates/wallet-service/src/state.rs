//! Application state.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::ledger::LedgerCache;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The in-memory ledger.
    pub cache: Arc<LedgerCache>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(cache: Arc<LedgerCache>, config: ServiceConfig) -> Self {
        Self { cache, config }
    }
}
