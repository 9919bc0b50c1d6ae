//! Prometheus metrics for the ledger host.
//!
//! [`LedgerMetrics`] owns a dedicated [`Registry`]; [`LedgerMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_gauge_with_registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Gauge, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tasknet_ledger::Ledger;

use crate::NodeError;

pub struct LedgerMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Accepted mutating calls, by operation.
    pub operations_accepted: IntCounterVec,
    /// Rejected mutating calls, by operation.
    pub operations_rejected: IntCounterVec,
    pub state_updates: IntCounter,
    pub jobs_completed: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub total_supply: Gauge,
    pub total_locked: Gauge,
    pub open_jobs: IntGauge,
    pub validator_count: IntGauge,
    pub emission_rate: Gauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub state_update_duration: Histogram,
}

impl LedgerMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let operations_accepted = register_int_counter_vec_with_registry!(
            Opts::new(
                "tasknet_operations_accepted_total",
                "Mutating ledger calls accepted and committed"
            ),
            &["operation"],
            registry
        )?;

        let operations_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "tasknet_operations_rejected_total",
                "Mutating ledger calls rejected without effect"
            ),
            &["operation"],
            registry
        )?;

        let state_updates = register_int_counter_with_registry!(
            Opts::new("tasknet_state_updates_total", "Accepted state updates"),
            registry
        )?;

        let jobs_completed = register_int_counter_with_registry!(
            Opts::new(
                "tasknet_jobs_completed_total",
                "Jobs whose payment was released into the reward pool"
            ),
            registry
        )?;

        let total_supply = register_gauge_with_registry!(
            Opts::new("tasknet_total_supply", "Materialized token supply"),
            registry
        )?;

        let total_locked = register_gauge_with_registry!(
            Opts::new("tasknet_total_locked", "Stake counted as active collateral"),
            registry
        )?;

        let open_jobs = register_int_gauge_with_registry!(
            Opts::new("tasknet_open_jobs", "Jobs currently holding escrow"),
            registry
        )?;

        let validator_count = register_int_gauge_with_registry!(
            Opts::new("tasknet_validator_count", "Validators ever created"),
            registry
        )?;

        let emission_rate = register_gauge_with_registry!(
            Opts::new("tasknet_emission_rate", "Tokens emitted per state update"),
            registry
        )?;

        // 100 µs → ~3 s.
        let state_update_duration = register_histogram_with_registry!(
            HistogramOpts::new(
                "tasknet_state_update_duration_seconds",
                "Time to validate, apply and commit a state update"
            )
            .buckets(prometheus::exponential_buckets(0.0001, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            operations_accepted,
            operations_rejected,
            state_updates,
            jobs_completed,
            total_supply,
            total_locked,
            open_jobs,
            validator_count,
            emission_rate,
            state_update_duration,
        })
    }

    pub fn accepted(&self, operation: &str) {
        self.operations_accepted.with_label_values(&[operation]).inc();
    }

    pub fn rejected(&self, operation: &str) {
        self.operations_rejected.with_label_values(&[operation]).inc();
    }

    /// Refresh the gauges from `ledger`.
    pub fn observe(&self, ledger: &Ledger) {
        self.total_supply.set(ledger.total_supply() as f64);
        self.total_locked.set(ledger.total_locked() as f64);
        self.open_jobs
            .set(i64::try_from(ledger.open_jobs()).unwrap_or(i64::MAX));
        self.validator_count
            .set(i64::try_from(ledger.validator_count()).unwrap_or(i64::MAX));
        self.emission_rate
            .set(ledger.emission().emission_rate() as f64);
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| NodeError::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}
