//! Balance of the configured validator identity.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{CheckError, Source, SourceCheck};
use crate::metrics::BalanceMetrics;
use crate::rpc::ClusterRpc;
use crate::types::{BalanceSample, Identity};

/// Tracks the SOL balance of one validator identity.
pub struct BalanceCheck {
    rpc: Arc<dyn ClusterRpc>,
    identity: Identity,
    metrics: BalanceMetrics,
}

impl BalanceCheck {
    pub fn new(rpc: Arc<dyn ClusterRpc>, identity: Identity, metrics: BalanceMetrics) -> Self {
        Self {
            rpc,
            identity,
            metrics,
        }
    }

    pub async fn sample(&self) -> Result<BalanceSample, CheckError> {
        let lamports = self.rpc.get_balance(&self.identity).await?;
        Ok(BalanceSample {
            identity: self.identity.clone(),
            lamports,
        })
    }
}

#[async_trait]
impl SourceCheck for BalanceCheck {
    fn source(&self) -> Source {
        Source::Balance
    }

    async fn refresh(&self) -> Result<(), CheckError> {
        let sample = self.sample().await?;
        let sol = sample.sol();
        info!(identity = %sample.identity, balance = sol, "validator balance");
        self.metrics
            .validator_balance
            .with_label_values(&[sample.identity.as_str()])
            .set(sol);
        Ok(())
    }
}
