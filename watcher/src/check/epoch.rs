//! Finalized epoch state of the cluster.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{CheckError, Source, SourceCheck};
use crate::metrics::EpochMetrics;
use crate::rpc::ClusterRpc;
use crate::types::EpochState;

/// Mirrors the cluster epoch state into the `solana_cluster_*` gauges.
pub struct EpochCheck {
    rpc: Arc<dyn ClusterRpc>,
    metrics: EpochMetrics,
}

impl EpochCheck {
    pub fn new(rpc: Arc<dyn ClusterRpc>, metrics: EpochMetrics) -> Self {
        Self { rpc, metrics }
    }

    /// Folds `state` into the gauges. Optional fields that are absent leave
    /// their gauge at the previous value.
    pub fn apply(&self, state: &EpochState) {
        self.metrics.epoch.set(state.epoch as f64);
        self.metrics.slot_index.set(state.slot_index as f64);
        self.metrics.absolute_slot.set(state.absolute_slot as f64);
        if let Some(height) = state.block_height {
            self.metrics.block_height.set(height as f64);
        }
        if let Some(count) = state.transaction_count {
            self.metrics.transaction_count.set(count as f64);
        }
    }
}

#[async_trait]
impl SourceCheck for EpochCheck {
    fn source(&self) -> Source {
        Source::Epoch
    }

    async fn refresh(&self) -> Result<(), CheckError> {
        let state = self.rpc.get_epoch_info().await?;
        debug!(
            epoch = state.epoch,
            slot_index = state.slot_index,
            absolute_slot = state.absolute_slot,
            "epoch info"
        );
        self.apply(&state);
        Ok(())
    }
}
