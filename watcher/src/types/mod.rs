//! Core domain types used by the watcher.
//!
//! This module defines the strongly-typed values that flow from the data
//! sources into the metrics sink: validator identities, epoch state and
//! balance samples. Everything here is transient: a value is produced by a
//! source checker, folded into the metrics registry and then dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aggregate and per-validator output of the `solana validators` command.
pub mod validators;

pub use validators::{ValidatorRecord, ValidatorSetSnapshot};

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Alphabet used by base-58 encoded Solana public keys.
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A 32-byte ed25519 public key encodes to between 32 and 44 base-58 chars.
const MIN_PUBKEY_LEN: usize = 32;
const MAX_PUBKEY_LEN: usize = 44;

/// Base-58 encoded public key of a validator.
///
/// The same string is used as an RPC query parameter and as the value of
/// the `identity` metric label, so it is carried around verbatim rather than
/// decoded into bytes. Identities read from configuration go through
/// [`Identity::from_str`], which checks the encoding; identities decoded from
/// the validators command output are trusted as-is.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Returns the base-58 string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error returned when a configured identity is not a base-58 public key.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity has {0} characters, expected 32 to 44")]
    Length(usize),
    #[error("identity contains non base-58 character {0:?}")]
    Character(char),
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let len = s.chars().count();
        if !(MIN_PUBKEY_LEN..=MAX_PUBKEY_LEN).contains(&len) {
            return Err(IdentityError::Length(len));
        }
        if let Some(bad) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(IdentityError::Character(bad));
        }
        Ok(Identity(s.to_string()))
    }
}

impl From<&str> for Identity {
    /// Wraps a string without validation.
    fn from(s: &str) -> Self {
        Identity(s.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cluster epoch state as reported by `getEpochInfo`.
///
/// `block_height` and `transaction_count` are optional upstream: a freshly
/// started node commonly omits them, and absence must never be read as zero.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochState {
    pub epoch: u64,
    pub slot_index: u64,
    pub absolute_slot: u64,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub transaction_count: Option<u64>,
}

/// Balance of one identity at the time of the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceSample {
    pub identity: Identity,
    pub lamports: u64,
}

impl BalanceSample {
    /// Balance converted to whole SOL.
    pub fn sol(&self) -> f64 {
        self.lamports as f64 / LAMPORTS_PER_SOL as f64
    }
}
