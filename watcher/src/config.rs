//! Runtime configuration for the watcher.
//!
//! [`WatcherConfig`] is a plain struct with defaults for everything except
//! the path to the `solana` binary. Binaries fill it from whatever surface
//! they expose (CLI flags, environment) and call [`WatcherConfig::validate`]
//! before wiring anything, so a bad configuration is rejected before the
//! first cycle runs.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::command::DEFAULT_OUTPUT_LIMIT;
use crate::types::{Identity, IdentityError};

/// Default local node RPC endpoint.
pub const DEFAULT_LOCAL_RPC: &str = "http://127.0.0.1:8899";

/// Default reference endpoint used to measure slot lag.
pub const DEFAULT_REFERENCE_RPC: &str = "https://api.mainnet-beta.solana.com";

/// Rejected configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("path to the solana binary is not set")]
    MissingBinary,
    #[error("metric interval must be at least one second")]
    InvalidInterval,
    #[error("invalid RPC endpoint {value:?}: {reason}")]
    InvalidEndpoint { value: String, reason: String },
    #[error("invalid validator identity: {0}")]
    InvalidIdentity(#[from] IdentityError),
    #[error("only-own-identity is enabled but no validator identity is configured")]
    OwnIdentityUnset,
    #[error("at least one reference RPC endpoint is required")]
    NoReferences,
    #[error("validators output limit must be greater than zero")]
    InvalidOutputLimit,
}

#[derive(Clone, Debug)]
pub struct WatcherConfig {
    /// Path to the `solana` CLI used for `solana validators`.
    pub solana_binary: Option<PathBuf>,
    /// Time between the starts of two collection cycles.
    pub interval: Duration,
    pub local_rpc: Url,
    /// Nodes the local slot is compared against.
    pub reference_rpcs: Vec<Url>,
    /// Identity whose balance is tracked. No balance checker without it.
    pub identity: Option<Identity>,
    /// Restrict per-validator gauges to [`Self::identity`].
    pub only_own_identity: bool,
    /// Endpoint passed to `solana validators --url`; the local node if unset.
    pub validators_rpc: Option<Url>,
    pub listen_addr: SocketAddr,
    pub rpc_timeout: Duration,
    /// Cap on the validators command stdout, in bytes.
    pub output_limit: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            solana_binary: None,
            interval: Duration::from_secs(60),
            local_rpc: Url::parse(DEFAULT_LOCAL_RPC).expect("hard-coded local RPC url should parse"),
            reference_rpcs: vec![
                Url::parse(DEFAULT_REFERENCE_RPC)
                    .expect("hard-coded reference RPC url should parse"),
            ],
            identity: None,
            only_own_identity: false,
            validators_rpc: None,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9898)),
            rpc_timeout: Duration::from_secs(10),
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }
}

impl WatcherConfig {
    /// Checks the invariants the collector relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solana_binary.is_none() {
            return Err(ConfigError::MissingBinary);
        }
        if self.interval < Duration::from_secs(1) {
            return Err(ConfigError::InvalidInterval);
        }
        if self.reference_rpcs.is_empty() {
            return Err(ConfigError::NoReferences);
        }
        for url in std::iter::once(&self.local_rpc)
            .chain(&self.reference_rpcs)
            .chain(&self.validators_rpc)
        {
            check_scheme(url)?;
        }
        if self.only_own_identity && self.identity.is_none() {
            return Err(ConfigError::OwnIdentityUnset);
        }
        if self.output_limit == 0 {
            return Err(ConfigError::InvalidOutputLimit);
        }
        Ok(())
    }

    /// Endpoint the validators command talks to.
    pub fn validators_rpc(&self) -> &Url {
        self.validators_rpc.as_ref().unwrap_or(&self.local_rpc)
    }

    /// Identity set for per-validator gauges, when filtering is enabled.
    pub fn identity_filter(&self) -> Option<HashSet<Identity>> {
        if !self.only_own_identity {
            return None;
        }
        self.identity.clone().map(|id| HashSet::from([id]))
    }
}

/// Parses an RPC endpoint given as text.
pub fn parse_endpoint(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidEndpoint {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    check_scheme(&url)?;
    Ok(url)
}

/// Parses a validator identity given as text.
pub fn parse_identity(value: &str) -> Result<Identity, ConfigError> {
    Ok(value.parse::<Identity>()?)
}

fn check_scheme(url: &Url) -> Result<(), ConfigError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidEndpoint {
            value: url.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
