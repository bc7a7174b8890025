use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{CommandError, run_json};
use crate::types::ValidatorSetSnapshot;

/// Anything that can produce a validator-set snapshot.
#[async_trait]
pub trait ValidatorSetSource: Send + Sync {
    async fn fetch(&self) -> Result<ValidatorSetSnapshot, CommandError>;
}

/// Runs `solana validators --output json-compact --url <rpc_url>`.
#[derive(Clone, Debug)]
pub struct ValidatorsCommand {
    binary: PathBuf,
    rpc_url: String,
    output_limit: usize,
}

impl ValidatorsCommand {
    pub fn new(binary: impl Into<PathBuf>, rpc_url: impl Into<String>, output_limit: usize) -> Self {
        Self {
            binary: binary.into(),
            rpc_url: rpc_url.into(),
            output_limit,
        }
    }

    /// Arguments passed to the binary.
    pub fn args(&self) -> [&str; 5] {
        ["validators", "--output", "json-compact", "--url", self.rpc_url.as_str()]
    }
}

#[async_trait]
impl ValidatorSetSource for ValidatorsCommand {
    async fn fetch(&self) -> Result<ValidatorSetSnapshot, CommandError> {
        let cmd = self.clone();
        debug!(binary = %cmd.binary.display(), url = %cmd.rpc_url, "running validators command");

        tokio::task::spawn_blocking(move || {
            run_json::<ValidatorSetSnapshot, _>(&cmd.binary, &cmd.args(), cmd.output_limit)
        })
        .await
        .map_err(|e| CommandError::Join(e.to_string()))?
    }
}
