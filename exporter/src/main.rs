//! Exporter binary.
//!
//! Polls a Solana validator node on a fixed interval through the `watcher`
//! crate and serves the collected gauges over HTTP:
//!
//! - `GET /metrics`: Prometheus text exposition,
//! - `GET /health`: liveness.
//!
//! Ctrl-C or SIGTERM stops the HTTP server and lets the collector finish
//! its current cycle before the process exits.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::ExporterArgs;
use state::{AppState, SharedState};
use watcher::{Collector, MetricsRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("exporter=info,watcher=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = ExporterArgs::parse();
    let cfg = args.into_config().context("invalid configuration")?;

    // ---------------------------
    // Metrics + collector
    // ---------------------------

    let metrics =
        Arc::new(MetricsRegistry::new().context("failed to initialise metrics registry")?);
    let collector =
        Collector::from_config(&cfg, &metrics).context("failed to set up collection")?;

    let shutdown = CancellationToken::new();

    let collector_shutdown = shutdown.clone();
    let interval = cfg.interval;
    let collector_task = tokio::spawn(async move {
        collector
            .run_until(interval, collector_shutdown.cancelled_owned())
            .await;
    });

    // ---------------------------
    // HTTP server
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        metrics: metrics.clone(),
    });
    let app = routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    tracing::info!("metrics exporter listening on http://{}/metrics", cfg.listen_addr);

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await;

    // Also stops the collector when the server exits on its own.
    shutdown.cancel();
    if let Err(e) = collector_task.await {
        tracing::warn!("collector task ended abnormally: {e}");
    }

    served.context("metrics server error")?;
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM, used for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn serve(metrics: Arc<MetricsRegistry>) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let app = routes::router(Arc::new(AppState { metrics }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server");
        });
        addr
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text_exposition() {
        let metrics = Arc::new(MetricsRegistry::new().expect("metrics"));
        metrics.slot_lag.delinquency.set(50.0);
        metrics
            .balance
            .validator_balance
            .with_label_values(&["abc"])
            .set(1.5);
        let addr = serve(metrics).await;

        let resp = reqwest::get(format!("http://{addr}/metrics"))
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = resp.text().await.expect("body");
        assert!(body.contains("# TYPE solana_node_delinquency gauge"));
        assert!(body.contains("solana_node_delinquency 50"));
        assert!(body.contains("validator_balance{identity=\"abc\"} 1.5"));
    }

    #[tokio::test]
    async fn health_and_unknown_paths() {
        let addr = serve(Arc::new(MetricsRegistry::new().expect("metrics"))).await;

        let health: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .expect("request")
            .json()
            .await
            .expect("json body");
        assert_eq!(health, serde_json::json!({"status": "ok"}));

        let missing = reqwest::get(format!("http://{addr}/nope"))
            .await
            .expect("request");
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
