//! Prometheus-backed metrics sink.
//!
//! [`MetricsRegistry`] owns a Prometheus registry and one strongly-typed
//! metrics group per source checker. Each checker is handed only its own
//! group at startup, so no two checkers can write the same gauge.

use prometheus::{self, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use tracing::error;

/// Label carrying a validator's base-58 identity.
pub const IDENTITY_LABEL: &str = "identity";

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
    let g = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn identity_gauge(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<GaugeVec, prometheus::Error> {
    let g = GaugeVec::new(Opts::new(name, help), &[IDENTITY_LABEL])?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

/// Gauges written by the slot-lag checker.
#[derive(Clone)]
pub struct SlotLagMetrics {
    /// Highest reference slot minus local slot.
    pub delinquency: Gauge,
}

impl SlotLagMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            delinquency: gauge(
                registry,
                "solana_node_delinquency",
                "Slots the local node is behind the highest reference node",
            )?,
        })
    }
}

/// Gauges written by the balance checker.
#[derive(Clone)]
pub struct BalanceMetrics {
    /// Identity balance in SOL.
    pub validator_balance: GaugeVec,
}

impl BalanceMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            validator_balance: identity_gauge(
                registry,
                "validator_balance",
                "Validator identity balance in SOL",
            )?,
        })
    }
}

/// Gauges written by the validator-set checker.
#[derive(Clone)]
pub struct ValidatorSetMetrics {
    pub average_skip_rate: Gauge,
    pub average_stake_weighted_skip_rate: Gauge,
    pub total_current_stake: Gauge,
    pub total_active_stake: Gauge,
    pub total_delinquent_stake: Gauge,
    pub highest_root: Gauge,
    pub highest_last_vote: Gauge,
    pub validator_activated_stake: GaugeVec,
    pub validator_commission: GaugeVec,
    pub validator_credits: GaugeVec,
    pub validator_epoch_credits: GaugeVec,
    pub validator_last_vote: GaugeVec,
    pub validator_root_slot: GaugeVec,
    /// Only has entries for validators that reported a skip rate.
    pub validator_skip_rate: GaugeVec,
}

impl ValidatorSetMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            average_skip_rate: gauge(
                registry,
                "average_skip_rate",
                "Average skip rate of all validators",
            )?,
            average_stake_weighted_skip_rate: gauge(
                registry,
                "average_stake_weighted_skip_rate",
                "Average stake weighted skip rate of all validators",
            )?,
            total_current_stake: gauge(
                registry,
                "total_current_stake",
                "Total current stake of all validators",
            )?,
            total_active_stake: gauge(
                registry,
                "total_active_stake",
                "Total active stake of all validators",
            )?,
            total_delinquent_stake: gauge(
                registry,
                "total_delinquent_stake",
                "Total delinquent stake of all validators",
            )?,
            highest_root: gauge(
                registry,
                "highest_root",
                "Highest root slot of all validators",
            )?,
            highest_last_vote: gauge(
                registry,
                "highest_last_vote",
                "Highest last vote of all validators",
            )?,
            validator_activated_stake: identity_gauge(
                registry,
                "validator_activated_stake",
                "Activated stake of a validator",
            )?,
            validator_commission: identity_gauge(
                registry,
                "validator_commission",
                "Commission of a validator",
            )?,
            validator_credits: identity_gauge(
                registry,
                "validator_credits",
                "Credits of a validator",
            )?,
            validator_epoch_credits: identity_gauge(
                registry,
                "validator_epoch_credits",
                "Epoch credits of a validator",
            )?,
            validator_last_vote: identity_gauge(
                registry,
                "validator_last_vote",
                "Last vote of a validator",
            )?,
            validator_root_slot: identity_gauge(
                registry,
                "validator_root_slot",
                "Root slot of a validator",
            )?,
            validator_skip_rate: identity_gauge(
                registry,
                "validator_skip_rate",
                "Skip rate of a validator",
            )?,
        })
    }
}

/// Gauges written by the epoch-state checker.
#[derive(Clone)]
pub struct EpochMetrics {
    pub epoch: Gauge,
    pub slot_index: Gauge,
    pub absolute_slot: Gauge,
    /// Left untouched when the node does not report it.
    pub block_height: Gauge,
    /// Left untouched when the node does not report it.
    pub transaction_count: Gauge,
}

impl EpochMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            epoch: gauge(
                registry,
                "solana_cluster_epoch",
                "Current epoch of the cluster",
            )?,
            slot_index: gauge(
                registry,
                "solana_cluster_slot_index",
                "Current slot index of the cluster",
            )?,
            absolute_slot: gauge(
                registry,
                "solana_cluster_absolute_slot",
                "Current absolute slot of the cluster",
            )?,
            block_height: gauge(
                registry,
                "solana_cluster_block_height",
                "Current block height of the cluster",
            )?,
            transaction_count: gauge(
                registry,
                "solana_cluster_transaction_count",
                "Current transaction count of the cluster",
            )?,
        })
    }
}

/// Process-wide metrics sink.
///
/// Constructed once at startup and shared behind an [`std::sync::Arc`] with
/// the scrape endpoint. The per-checker groups are cloned out of it and
/// moved into their checkers; clones share the same underlying gauges.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub slot_lag: SlotLagMetrics,
    pub balance: BalanceMetrics,
    pub validators: ValidatorSetMetrics,
    pub epoch: EpochMetrics,
}

impl MetricsRegistry {
    /// Creates a fresh registry and declares every metric.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let slot_lag = SlotLagMetrics::register(&registry)?;
        let balance = BalanceMetrics::register(&registry)?;
        let validators = ValidatorSetMetrics::register(&registry)?;
        let epoch = EpochMetrics::register(&registry)?;
        Ok(Self {
            registry,
            slot_lag,
            balance,
            validators,
            epoch,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Content type of [`MetricsRegistry::gather_text`].
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
