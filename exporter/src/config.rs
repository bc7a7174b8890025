//! Exporter configuration.
//!
//! Every setting is a command-line flag with an environment variable
//! fallback. Parsing only collects strings and numbers; turning them into a
//! [`WatcherConfig`] is where endpoints and the identity get validated.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use watcher::WatcherConfig;
use watcher::command::DEFAULT_OUTPUT_LIMIT;
use watcher::config::{
    ConfigError, DEFAULT_LOCAL_RPC, DEFAULT_REFERENCE_RPC, parse_endpoint, parse_identity,
};

/// Prometheus exporter for a Solana validator node.
#[derive(Clone, Debug, Parser)]
#[command(name = "exporter", version, about)]
pub struct ExporterArgs {
    /// Path to the solana CLI binary.
    #[arg(long, env = "SOLANA_BINARY_PATH")]
    pub solana_binary: Option<PathBuf>,

    /// Seconds between collection cycles.
    #[arg(long, env = "METRIC_FREQUENCY", default_value_t = 60)]
    pub metric_frequency: u64,

    /// RPC endpoint of the local node.
    #[arg(long, env = "LOCAL_RPC_URI", default_value = DEFAULT_LOCAL_RPC)]
    pub local_rpc_uri: String,

    /// Comma-separated reference RPC endpoints for the slot lag.
    #[arg(
        long,
        env = "REFERENCE_RPC_URIS",
        value_delimiter = ',',
        default_value = DEFAULT_REFERENCE_RPC
    )]
    pub reference_rpc_uris: Vec<String>,

    /// Identity public key whose balance is tracked.
    #[arg(long, env = "VALIDATOR_IDENTITY")]
    pub validator_identity: Option<String>,

    /// Export per-validator gauges only for the configured identity.
    #[arg(
        long,
        env = "ONLY_OWN_IDENTITY",
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub only_own_identity: bool,

    /// RPC endpoint for `solana validators`; defaults to the local node.
    #[arg(long, env = "VALIDATORS_RPC_URI")]
    pub validators_rpc_uri: Option<String>,

    /// Address the metrics endpoint binds to.
    #[arg(long, env = "METRICS_LISTEN_ADDR", default_value = "0.0.0.0:9898")]
    pub listen_addr: SocketAddr,

    /// Per-request RPC timeout in seconds.
    #[arg(long, env = "RPC_TIMEOUT_SECS", default_value_t = 10)]
    pub rpc_timeout_secs: u64,

    /// Maximum bytes read from the validators command stdout.
    #[arg(long, env = "VALIDATORS_OUTPUT_LIMIT", default_value_t = DEFAULT_OUTPUT_LIMIT)]
    pub validators_output_limit: usize,
}

impl ExporterArgs {
    /// Converts the raw arguments into a validated [`WatcherConfig`].
    pub fn into_config(self) -> Result<WatcherConfig, ConfigError> {
        let reference_rpcs = self
            .reference_rpc_uris
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(parse_endpoint)
            .collect::<Result<Vec<_>, _>>()?;

        let identity = self
            .validator_identity
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_identity)
            .transpose()?;

        let validators_rpc = self
            .validators_rpc_uri
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_endpoint)
            .transpose()?;

        let config = WatcherConfig {
            solana_binary: self.solana_binary,
            interval: Duration::from_secs(self.metric_frequency),
            local_rpc: parse_endpoint(&self.local_rpc_uri)?,
            reference_rpcs,
            identity,
            only_own_identity: self.only_own_identity,
            validators_rpc,
            listen_addr: self.listen_addr,
            rpc_timeout: Duration::from_secs(self.rpc_timeout_secs),
            output_limit: self.validators_output_limit,
        };
        config.validate()?;
        Ok(config)
    }
}
