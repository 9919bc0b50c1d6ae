//! tasknet ledger host.
//!
//! Wraps the core [`tasknet_ledger::Ledger`] with everything a running
//! process needs:
//! - a single-writer lock with a re-entrancy guard
//! - durable, all-or-nothing commits to a [`tasknet_store::LedgerStore`]
//! - dispatch of outward calls to the certifier component
//! - event fan-out, Prometheus metrics and structured logging
//! - TOML configuration

pub mod certifier;
pub mod config;
pub mod error;
pub mod ledger_event;
pub mod logging;
pub mod metrics;
pub mod node;

pub use certifier::{OutboxCertifier, OutboxEntry};
pub use config::{Allocation, CertifierConfig, EmissionConfig, GenesisConfig, NodeConfig, ParamsConfig};
pub use error::NodeError;
pub use ledger_event::EventBus;
pub use logging::{init_logging, LogFormat};
pub use metrics::LedgerMetrics;
pub use node::LedgerNode;
