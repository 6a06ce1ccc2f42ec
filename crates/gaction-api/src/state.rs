//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::registry::ConnectorRegistry;

/// Shared application state, cheap to clone into each handler.
#[derive(Clone)]
pub struct AppState {
    /// Bot connectors keyed by Recast token.
    pub registry: Arc<ConnectorRegistry>,
    /// Maximum webhook body size.
    pub body_limit_bytes: usize,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: ConnectorRegistry, body_limit_bytes: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            body_limit_bytes,
            start_time: Instant::now(),
        }
    }
}
