//! Shared application state handed to the HTTP handlers.

use std::sync::Arc;

use prometheus::Registry;

use crate::collector::ProcessCollector;
use crate::metrics::ProcessMetrics;

/// Application state shared across requests. The registry, metric set and
/// collector are constructed once at startup and injected here; nothing is
/// registered globally.
pub struct AppState {
    pub registry: Registry,
    pub metrics: ProcessMetrics,
    pub collector: ProcessCollector,
}

/// Type alias for shared application state
pub type SharedState = Arc<AppState>;
