//! Shared application state.

use std::sync::Arc;

use watcher::MetricsRegistry;

/// State handed to request handlers via Axum's `State` extractor.
///
/// The registry is written by the collector task and only read here.
pub struct AppState {
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
