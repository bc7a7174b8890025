//! Metrics sink for the watcher.
//!
//! This module declares every gauge the exporter publishes and renders the
//! registry in the Prometheus text format for the scrape endpoint.
//!
//! Typical usage:
//!
//! ```ignore
//! use std::sync::Arc;
//! use watcher::metrics::MetricsRegistry;
//!
//! let metrics = Arc::new(MetricsRegistry::new()?);
//!
//! // Each checker receives only the group it owns:
//! let epoch_check = EpochCheck::new(local_rpc, metrics.epoch.clone());
//!
//! // The scrape handler renders everything:
//! let body = metrics.gather_text();
//! ```

pub mod prometheus;

pub use self::prometheus::{
    BalanceMetrics, EpochMetrics, IDENTITY_LABEL, MetricsRegistry, SlotLagMetrics,
    ValidatorSetMetrics,
};
