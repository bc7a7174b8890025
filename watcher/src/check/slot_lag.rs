//! Slot lag of the local node relative to reference nodes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{CheckError, Source, SourceCheck};
use crate::metrics::SlotLagMetrics;
use crate::rpc::ClusterRpc;

/// Lag of `local` behind the highest of `references`.
///
/// Failed references are passed in as `0`, so they can only lower the
/// result. With no reachable reference the lag goes negative, which is the
/// signal that the references are down.
pub fn compute_slot_lag(local: u64, references: &[u64]) -> i64 {
    let highest = references.iter().copied().max().unwrap_or(0);
    highest as i64 - local as i64
}

/// Compares the local node's slot with a set of reference nodes.
pub struct SlotLagCheck {
    local: Arc<dyn ClusterRpc>,
    references: Vec<Arc<dyn ClusterRpc>>,
    metrics: SlotLagMetrics,
}

impl SlotLagCheck {
    pub fn new(
        local: Arc<dyn ClusterRpc>,
        references: Vec<Arc<dyn ClusterRpc>>,
        metrics: SlotLagMetrics,
    ) -> Self {
        Self {
            local,
            references,
            metrics,
        }
    }

    async fn reference_slot(reference: &dyn ClusterRpc) -> u64 {
        match reference.get_slot().await {
            Ok(slot) => {
                debug!(endpoint = %reference.endpoint(), slot, "reference slot");
                slot
            }
            Err(e) => {
                warn!(endpoint = %reference.endpoint(), error = %e, "could not get reference slot");
                0
            }
        }
    }

    /// Queries every endpoint concurrently and returns the lag, or the local
    /// query's error.
    pub async fn slot_lag(&self) -> Result<i64, CheckError> {
        let (local, references) = tokio::join!(
            self.local.get_slot(),
            join_all(
                self.references
                    .iter()
                    .map(|r| Self::reference_slot(r.as_ref()))
            ),
        );

        let local = local?;
        Ok(compute_slot_lag(local, &references))
    }
}

#[async_trait]
impl SourceCheck for SlotLagCheck {
    fn source(&self) -> Source {
        Source::SlotLag
    }

    async fn refresh(&self) -> Result<(), CheckError> {
        let lag = self.slot_lag().await?;
        info!(lag, "slot lag");
        self.metrics.delinquency.set(lag as f64);
        Ok(())
    }
}
