//! Collection orchestrator.
//!
//! The [`Collector`] owns the configured source checkers and drives them:
//! one cycle immediately at startup, then one cycle per interval. Within a
//! cycle every checker runs as its own task; a failing or panicking checker
//! is logged and reported without affecting the others. Cycles never
//! overlap, and shutdown is only observed between cycles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::check::{
    BalanceCheck, CheckError, EpochCheck, SlotLagCheck, Source, SourceCheck, ValidatorSetCheck,
};
use crate::command::ValidatorsCommand;
use crate::config::{ConfigError, WatcherConfig};
use crate::metrics::MetricsRegistry;
use crate::rpc::{ClusterRpc, HttpRpcClient, RpcError};

/// Failure to assemble a [`Collector`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create RPC client: {0}")]
    Rpc(#[from] RpcError),
}

/// Outcome of one collection cycle, one entry per checker, sorted by source.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(Source, Result<(), CheckError>)>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn failures(&self) -> impl Iterator<Item = (Source, &CheckError)> {
        self.outcomes
            .iter()
            .filter_map(|(source, outcome)| outcome.as_ref().err().map(|e| (*source, e)))
    }

    pub fn is_success(&self, source: Source) -> bool {
        self.outcomes
            .iter()
            .any(|(s, outcome)| *s == source && outcome.is_ok())
    }
}

/// Runs the configured source checkers, one task each, once per cycle.
pub struct Collector {
    checks: Vec<Arc<dyn SourceCheck>>,
}

impl Collector {
    pub fn new(checks: Vec<Arc<dyn SourceCheck>>) -> Self {
        Self { checks }
    }

    /// Validates `config` and wires one checker per data source into
    /// `metrics`. The balance checker is only added when an identity is set.
    pub fn from_config(config: &WatcherConfig, metrics: &MetricsRegistry) -> Result<Self, BuildError> {
        config.validate()?;
        let Some(binary) = &config.solana_binary else {
            return Err(ConfigError::MissingBinary.into());
        };

        let local: Arc<dyn ClusterRpc> =
            Arc::new(HttpRpcClient::new(config.local_rpc.clone(), config.rpc_timeout)?);
        let references = config
            .reference_rpcs
            .iter()
            .map(|url| {
                HttpRpcClient::new(url.clone(), config.rpc_timeout)
                    .map(|client| Arc::new(client) as Arc<dyn ClusterRpc>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut checks: Vec<Arc<dyn SourceCheck>> = vec![Arc::new(SlotLagCheck::new(
            local.clone(),
            references,
            metrics.slot_lag.clone(),
        ))];
        if let Some(identity) = &config.identity {
            checks.push(Arc::new(BalanceCheck::new(
                local.clone(),
                identity.clone(),
                metrics.balance.clone(),
            )));
        }
        let command = ValidatorsCommand::new(
            binary.clone(),
            config.validators_rpc().as_str(),
            config.output_limit,
        );
        checks.push(Arc::new(ValidatorSetCheck::new(
            Arc::new(command),
            config.identity_filter(),
            metrics.validators.clone(),
        )));
        checks.push(Arc::new(EpochCheck::new(local, metrics.epoch.clone())));

        Ok(Self::new(checks))
    }

    /// Sources this collector will run each cycle.
    pub fn sources(&self) -> Vec<Source> {
        self.checks.iter().map(|c| c.source()).collect()
    }

    /// Runs every checker once, concurrently, and waits for all of them.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();

        // Spawn everything first so the checkers overlap, then collect.
        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let check = Arc::clone(check);
                (check.source(), tokio::spawn(async move { check.refresh().await }))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(CheckError::Aborted(e.to_string())),
            };
            if let Err(e) = &outcome {
                warn!(%source, error = %e, "source check failed");
            }
            outcomes.push((source, outcome));
        }
        outcomes.sort_by_key(|(source, _)| *source);

        CycleReport {
            outcomes,
            elapsed: started.elapsed(),
        }
    }

    /// Runs cycles every `interval` until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A cycle that overruns the
    /// interval pushes the next one to the following scheduled tick; ticks
    /// that passed while it ran are dropped.
    pub async fn run_until<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let interval = interval.max(Duration::from_millis(1));
        tokio::pin!(shutdown);

        info!(
            interval_secs = interval.as_secs_f64(),
            sources = ?self.sources(),
            "collector started"
        );

        let mut tick = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = sleep_until(tick) => {}
            }

            let report = self.run_cycle().await;
            let failed = report.failures().count();
            let elapsed_ms = report.elapsed.as_millis() as u64;
            if failed == 0 {
                debug!(elapsed_ms, "collection cycle complete");
            } else {
                info!(elapsed_ms, failed, "collection cycle complete with failures");
            }

            let next = next_tick(tick, interval, Instant::now());
            if next > tick + interval {
                warn!(
                    elapsed_ms,
                    interval_ms = interval.as_millis() as u64,
                    "collection cycle overran its interval"
                );
            }
            tick = next;
        }

        info!("collector stopped");
    }
}

/// First scheduled tick after `last` that is not already in the past.
fn next_tick(last: Instant, interval: Duration, now: Instant) -> Instant {
    let mut next = last + interval;
    while next < now {
        next += interval;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::test_support::StubRpc;
    use crate::check::validators::test_support::{SINGLE_NULL_SKIP, StubValidators};
    use crate::types::{EpochState, Identity};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn next_tick_skips_ticks_missed_by_a_slow_cycle() {
        let start = Instant::now();
        let second = Duration::from_secs(1);

        assert_eq!(next_tick(start, second, start), start + second);
        assert_eq!(
            next_tick(start, second, start + Duration::from_millis(400)),
            start + second
        );
        assert_eq!(next_tick(start, second, start + second), start + second);
        assert_eq!(
            next_tick(start, second, start + Duration::from_millis(2_300)),
            start + Duration::from_secs(3)
        );
    }

    const KEY: &str = "7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2";

    fn epoch() -> EpochState {
        EpochState {
            epoch: 27,
            slot_index: 2790,
            absolute_slot: 166_598,
            block_height: Some(166_500),
            transaction_count: None,
        }
    }

    fn local() -> Arc<dyn ClusterRpc> {
        Arc::new(
            StubRpc::new("local")
                .with_slot(100)
                .with_balance(2_000_000_000)
                .with_epoch(epoch()),
        )
    }

    fn collector(metrics: &MetricsRegistry, validators: Option<&'static str>) -> Collector {
        let local = local();
        let references: Vec<Arc<dyn ClusterRpc>> = vec![
            Arc::new(StubRpc::new("ref-a").with_slot(150)),
            Arc::new(StubRpc::new("ref-b")),
        ];
        Collector::new(vec![
            Arc::new(SlotLagCheck::new(
                local.clone(),
                references,
                metrics.slot_lag.clone(),
            )),
            Arc::new(BalanceCheck::new(
                local.clone(),
                Identity::from(KEY),
                metrics.balance.clone(),
            )),
            Arc::new(ValidatorSetCheck::new(
                Arc::new(StubValidators(validators)),
                None,
                metrics.validators.clone(),
            )),
            Arc::new(EpochCheck::new(local, metrics.epoch.clone())),
        ])
    }

    #[tokio::test]
    async fn cycle_runs_every_source() {
        let metrics = MetricsRegistry::new().expect("metrics");
        let report = collector(&metrics, Some(SINGLE_NULL_SKIP)).run_cycle().await;

        let sources: Vec<Source> = report.outcomes.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            sources,
            vec![Source::SlotLag, Source::Balance, Source::ValidatorSet, Source::Epoch]
        );
        assert_eq!(report.failures().count(), 0);

        assert_eq!(metrics.slot_lag.delinquency.get(), 50.0);
        assert_eq!(
            metrics.balance.validator_balance.with_label_values(&[KEY]).get(),
            2.0
        );
        assert_eq!(metrics.validators.highest_root.get(), 10.0);
        assert_eq!(metrics.epoch.block_height.get(), 166_500.0);
    }

    #[tokio::test]
    async fn failing_command_does_not_affect_other_sources() {
        let metrics = MetricsRegistry::new().expect("metrics");
        let report = collector(&metrics, None).run_cycle().await;

        let failures: Vec<Source> = report.failures().map(|(s, _)| s).collect();
        assert_eq!(failures, vec![Source::ValidatorSet]);
        assert!(report.is_success(Source::SlotLag));
        assert!(report.is_success(Source::Balance));
        assert!(report.is_success(Source::Epoch));

        assert_eq!(metrics.slot_lag.delinquency.get(), 50.0);
        assert_eq!(metrics.epoch.epoch.get(), 27.0);
        assert_eq!(metrics.validators.total_active_stake.get(), 0.0);
        assert!(!metrics.gather_text().contains("validator_root_slot{"));
    }

    #[test]
    fn from_config_wires_balance_only_with_identity() {
        let metrics = MetricsRegistry::new().expect("metrics");
        let mut config = WatcherConfig {
            solana_binary: Some("/usr/local/bin/solana".into()),
            ..WatcherConfig::default()
        };

        let collector = Collector::from_config(&config, &metrics).expect("collector");
        assert_eq!(
            collector.sources(),
            vec![Source::SlotLag, Source::ValidatorSet, Source::Epoch]
        );

        config.identity = Some(Identity::from(KEY));
        let collector = Collector::from_config(&config, &metrics).expect("collector");
        assert_eq!(
            collector.sources(),
            vec![Source::SlotLag, Source::Balance, Source::ValidatorSet, Source::Epoch]
        );
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let metrics = MetricsRegistry::new().expect("metrics");
        let err = Collector::from_config(&WatcherConfig::default(), &metrics)
            .err()
            .expect("missing binary is rejected");
        assert!(matches!(err, BuildError::Config(ConfigError::MissingBinary)));
    }

    struct PanickingCheck;

    #[async_trait]
    impl SourceCheck for PanickingCheck {
        fn source(&self) -> Source {
            Source::Balance
        }

        async fn refresh(&self) -> Result<(), CheckError> {
            panic!("balance check blew up");
        }
    }

    #[tokio::test]
    async fn panicking_check_is_reported_as_failure() {
        let metrics = MetricsRegistry::new().expect("metrics");
        let collector = Collector::new(vec![
            Arc::new(PanickingCheck),
            Arc::new(EpochCheck::new(local(), metrics.epoch.clone())),
        ]);

        let report = collector.run_cycle().await;
        let failures: Vec<Source> = report.failures().map(|(s, _)| s).collect();
        assert_eq!(failures, vec![Source::Balance]);
        assert!(matches!(report.outcomes[0].1, Err(CheckError::Aborted(_))));
        assert!(report.is_success(Source::Epoch));
        assert_eq!(metrics.epoch.epoch.get(), 27.0);
    }

    struct CountingCheck(Arc<AtomicUsize>);

    #[async_trait]
    impl SourceCheck for CountingCheck {
        fn source(&self) -> Source {
            Source::Epoch
        }

        async fn refresh(&self) -> Result<(), CheckError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_immediately_then_per_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let collector = Collector::new(vec![Arc::new(CountingCheck(runs.clone()))]);

        let shutdown = tokio::time::sleep(Duration::from_millis(2_500));
        collector.run_until(Duration::from_secs(1), shutdown).await;

        // Ticks at 0s, 1s and 2s; shutdown at 2.5s.
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_start_runs_nothing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let collector = Collector::new(vec![Arc::new(CountingCheck(runs.clone()))]);

        collector
            .run_until(Duration::from_secs(1), std::future::ready(()))
            .await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    struct SlowCheck(Arc<AtomicUsize>);

    #[async_trait]
    impl SourceCheck for SlowCheck {
        fn source(&self) -> Source {
            Source::SlotLag
        }

        async fn refresh(&self) -> Result<(), CheckError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_do_not_overlap() {
        let runs = Arc::new(AtomicUsize::new(0));
        let collector = Collector::new(vec![Arc::new(SlowCheck(runs.clone()))]);

        // Cycle 1 runs 0s..1.5s, the 1s tick is skipped, cycle 2 starts at
        // 2s and finishes at 3.5s; shutdown at 3.2s is seen only afterwards.
        let shutdown = tokio::time::sleep(Duration::from_millis(3_200));
        collector.run_until(Duration::from_secs(1), shutdown).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
