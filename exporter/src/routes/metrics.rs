use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::state::SharedState;

/// `GET /metrics`
///
/// Renders the current registry in the Prometheus text exposition format.
/// Gauges hold whatever the last successful cycle wrote.
pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    let body = state.metrics.gather_text();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, state.metrics.content_type())],
        body,
    )
}
