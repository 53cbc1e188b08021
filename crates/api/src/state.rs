//! Application state shared across handlers.

use attribution::AttributionEngine;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Engine over the configured backend (memory or ClickHouse)
    pub engine: Arc<AttributionEngine>,
}

impl AppState {
    pub fn new(engine: Arc<AttributionEngine>) -> Self {
        Self { engine }
    }
}
