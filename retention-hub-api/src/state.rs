//! Application state shared across handlers

use retention_hub_engine::ResolutionEngine;
use retention_hub_storage::{InMemoryStorage, Storage};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub engine: ResolutionEngine,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(InMemoryStorage::new()))
    }

    /// Create with a custom storage backend
    pub fn with_storage(store: Arc<dyn Storage>) -> Self {
        Self {
            engine: ResolutionEngine::new(store.clone()),
            store,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
