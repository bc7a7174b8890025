//! Watcher library crate.
//!
//! This crate collects health and performance data about a Solana
//! validator and keeps it in a Prometheus registry:
//!
//! - domain types decoded from RPC and CLI output (`types`),
//! - a JSON-RPC client for cluster nodes (`rpc`),
//! - an adapter for the `solana` CLI (`command`),
//! - one checker per data source (`check`),
//! - the metrics sink (`metrics`),
//! - the polling orchestrator (`collector`),
//! - and the runtime configuration (`config`).
//!
//! Binaries build a [`MetricsRegistry`], wire a [`Collector`] from a
//! [`WatcherConfig`] and serve the registry however they like.

pub mod check;
pub mod collector;
pub mod command;
pub mod config;
pub mod metrics;
pub mod rpc;
pub mod types;

pub use check::{
    BalanceCheck, CheckError, EpochCheck, SlotLagCheck, Source, SourceCheck, ValidatorSetCheck,
};
pub use collector::{BuildError, Collector, CycleReport};
pub use command::{CommandError, ValidatorSetSource, ValidatorsCommand};
pub use config::{ConfigError, WatcherConfig};
pub use metrics::MetricsRegistry;
pub use rpc::{ClusterRpc, HttpRpcClient, RpcError};
pub use types::*;
