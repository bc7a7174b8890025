//! Source checkers.
//!
//! Each checker wraps one data source and exposes a single `refresh`
//! operation that either updates the gauges it owns or reports why it
//! could not. The collector runs all of them once per cycle:
//!
//! - [`SlotLagCheck`]: local slot against reference nodes,
//! - [`BalanceCheck`]: balance of the configured identity,
//! - [`ValidatorSetCheck`]: cluster-wide validator statistics from the CLI,
//! - [`EpochCheck`]: finalized epoch state.

pub mod balance;
pub mod epoch;
pub mod slot_lag;
pub mod validators;

pub use balance::BalanceCheck;
pub use epoch::EpochCheck;
pub use slot_lag::{SlotLagCheck, compute_slot_lag};
pub use validators::ValidatorSetCheck;

use std::fmt;

use async_trait::async_trait;

use crate::command::CommandError;
use crate::rpc::RpcError;

/// Identifies a checker in logs and cycle reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Source {
    SlotLag,
    Balance,
    ValidatorSet,
    Epoch,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::SlotLag => "slot_lag",
            Source::Balance => "balance",
            Source::ValidatorSet => "validator_set",
            Source::Epoch => "epoch",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a checker produced no update this cycle.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Command(#[from] CommandError),
    /// The checker task panicked or was cancelled.
    #[error("check task aborted: {0}")]
    Aborted(String),
}

/// One independently fallible data source.
#[async_trait]
pub trait SourceCheck: Send + Sync {
    fn source(&self) -> Source;

    /// Queries the source and updates the owned gauges.
    ///
    /// On error nothing has been written.
    async fn refresh(&self) -> Result<(), CheckError>;
}
