//! Clients for the Solana JSON-RPC data sources.
//!
//! The source checkers only see the [`ClusterRpc`] trait, so tests can swap
//! in in-memory sources and the local node and reference nodes can be
//! served by the same [`HttpRpcClient`] implementation.

pub mod http;

pub use http::HttpRpcClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{EpochState, Identity};

/// Errors that can occur while querying an RPC endpoint.
///
/// Every variant is a transport failure from the point of view of the
/// checkers: the call produced no usable data this cycle.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Connection failure, timeout or an undecodable body.
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-2xx status.
    #[error("{endpoint} returned HTTP status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    /// The endpoint answered with a JSON-RPC error object.
    #[error("{endpoint} returned JSON-RPC error {code}: {message}")]
    JsonRpc {
        endpoint: String,
        code: i64,
        message: String,
    },
    /// The response had neither `result` nor `error`.
    #[error("{endpoint} returned a response without a result")]
    MissingResult { endpoint: String },
    /// The `result` did not have the expected shape.
    #[error("failed to decode {method} result from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Commitment level attached to a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Finalized,
}

/// The subset of the Solana RPC API the checkers depend on.
#[async_trait]
pub trait ClusterRpc: Send + Sync {
    /// Endpoint this client talks to, used in log context.
    fn endpoint(&self) -> &str;

    /// Most recent slot the node has processed.
    async fn get_slot(&self) -> Result<u64, RpcError>;

    /// Balance of `identity` in lamports.
    async fn get_balance(&self, identity: &Identity) -> Result<u64, RpcError>;

    /// Epoch state at `finalized` commitment.
    async fn get_epoch_info(&self) -> Result<EpochState, RpcError>;
}
