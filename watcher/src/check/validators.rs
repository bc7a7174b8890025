//! Cluster-wide validator statistics from the `solana validators` command.
//!
//! The aggregate fields and the per-validator records come from one decode
//! of the command output. If the command fails or its output does not
//! decode, nothing from this cycle is written: partially trusting a
//! malformed payload is worse than leaving the previous values in place.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{CheckError, Source, SourceCheck};
use crate::command::ValidatorSetSource;
use crate::metrics::ValidatorSetMetrics;
use crate::types::{Identity, ValidatorSetSnapshot};

/// Exports cluster aggregates and per-validator gauges from one validator-set snapshot.
pub struct ValidatorSetCheck {
    source: Arc<dyn ValidatorSetSource>,
    /// Identities to export per-validator gauges for; `None` means all.
    include: Option<HashSet<Identity>>,
    metrics: ValidatorSetMetrics,
}

impl ValidatorSetCheck {
    pub fn new(
        source: Arc<dyn ValidatorSetSource>,
        include: Option<HashSet<Identity>>,
        metrics: ValidatorSetMetrics,
    ) -> Self {
        Self {
            source,
            include,
            metrics,
        }
    }

    /// Writes a decoded snapshot and returns how many validators got
    /// per-validator gauges.
    pub fn apply(&self, snapshot: &ValidatorSetSnapshot) -> usize {
        let m = &self.metrics;

        m.average_skip_rate.set(snapshot.average_skip_rate);
        m.average_stake_weighted_skip_rate
            .set(snapshot.average_stake_weighted_skip_rate);
        m.total_current_stake.set(snapshot.total_current_stake as f64);
        m.total_active_stake.set(snapshot.total_active_stake as f64);
        m.total_delinquent_stake
            .set(snapshot.total_delinquent_stake as f64);

        // Maxima are taken over the whole cluster, before filtering.
        if let Some(root) = snapshot.highest_root() {
            m.highest_root.set(root as f64);
        }
        if let Some(vote) = snapshot.highest_last_vote() {
            m.highest_last_vote.set(vote as f64);
        }

        let mut written = 0;
        for v in snapshot.filtered(self.include.as_ref()) {
            let labels = [v.identity_pubkey.as_str()];
            m.validator_activated_stake
                .with_label_values(&labels)
                .set(v.activated_stake as f64);
            m.validator_commission
                .with_label_values(&labels)
                .set(f64::from(v.commission));
            m.validator_credits
                .with_label_values(&labels)
                .set(v.credits as f64);
            m.validator_epoch_credits
                .with_label_values(&labels)
                .set(v.epoch_credits as f64);
            m.validator_last_vote
                .with_label_values(&labels)
                .set(v.last_vote as f64);
            m.validator_root_slot
                .with_label_values(&labels)
                .set(v.root_slot as f64);
            match v.skip_rate {
                Some(skip_rate) => m
                    .validator_skip_rate
                    .with_label_values(&labels)
                    .set(skip_rate),
                // Err only means there was no entry to drop.
                None => {
                    let _ = m.validator_skip_rate.remove_label_values(&labels);
                }
            }
            written += 1;
        }
        written
    }
}

#[async_trait]
impl SourceCheck for ValidatorSetCheck {
    fn source(&self) -> Source {
        Source::ValidatorSet
    }

    async fn refresh(&self) -> Result<(), CheckError> {
        let snapshot = self.source.fetch().await?;
        let written = self.apply(&snapshot);
        info!(
            validators = snapshot.validators.len(),
            exported = written,
            "saved validator metrics"
        );
        Ok(())
    }
}
