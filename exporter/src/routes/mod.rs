//! HTTP routes served by the exporter.

pub mod health;
pub mod metrics;

use axum::{Router, routing::get};

use crate::state::SharedState;

/// Builds the router: `GET /metrics` and `GET /health`. Anything else is 404.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health))
        .with_state(state)
}
