use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
///
/// Liveness only: the process is up and serving. Collection failures are
/// visible in the logs and as stale gauges, not here.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
