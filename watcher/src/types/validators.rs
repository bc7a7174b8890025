use std::collections::HashSet;

use serde::Deserialize;

use super::Identity;

/// Parsed output of `solana validators --output json-compact`.
///
/// Every field listed here is required: a payload missing any of them is
/// rejected at decode time instead of being defaulted. Extra keys emitted by
/// newer CLI versions are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorSetSnapshot {
    pub average_skip_rate: f64,
    pub average_stake_weighted_skip_rate: f64,
    pub total_current_stake: u64,
    pub total_active_stake: u64,
    pub total_delinquent_stake: u64,
    pub validators: Vec<ValidatorRecord>,
}

/// One entry of the `validators` array.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRecord {
    pub identity_pubkey: Identity,
    pub activated_stake: u64,
    pub commission: u8,
    pub credits: u64,
    pub epoch_credits: u64,
    pub delinquent: bool,
    pub last_vote: u64,
    pub root_slot: u64,
    /// `None` when the validator has no leader slots sampled yet. Not zero.
    #[serde(default)]
    pub skip_rate: Option<f64>,
    pub version: String,
}

impl ValidatorSetSnapshot {
    /// Highest root slot across every validator, ignoring any filter.
    pub fn highest_root(&self) -> Option<u64> {
        self.validators.iter().map(|v| v.root_slot).max()
    }

    /// Highest last vote across every validator, ignoring any filter.
    pub fn highest_last_vote(&self) -> Option<u64> {
        self.validators.iter().map(|v| v.last_vote).max()
    }

    /// Records to export per-validator metrics for.
    ///
    /// With no filter (or an empty one) every record is returned in command
    /// output order; otherwise exactly the records whose identity is in
    /// `include`, still in their original relative order.
    pub fn filtered<'a>(
        &'a self,
        include: Option<&'a HashSet<Identity>>,
    ) -> impl Iterator<Item = &'a ValidatorRecord> + 'a {
        let include = include.filter(|set| !set.is_empty());
        self.validators
            .iter()
            .filter(move |v| include.is_none_or(|set| set.contains(&v.identity_pubkey)))
    }
}
