//! Node configuration with TOML file support.
//!
//! TOML integers are 64-bit, so amounts in the file are `u64` and widened to
//! the ledger's `u128` when the genesis ledger is built.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tasknet_emission::EmissionParams;
use tasknet_types::{Address, ProtocolParams};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a tasknet ledger host.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Used once, when the data directory holds no ledger yet.
    #[serde(default)]
    pub genesis: GenesisConfig,

    #[serde(default)]
    pub certifier: CertifierConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Settable later, once, by the owner when omitted.
    #[serde(default)]
    pub certifier: Option<Address>,

    #[serde(default)]
    pub allocations: Vec<Allocation>,

    #[serde(default)]
    pub params: ParamsConfig,

    #[serde(default)]
    pub emission: EmissionConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub address: Address,
    pub amount: u64,
}

/// File form of [`ProtocolParams`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    pub min_stake: u64,
    pub unlock_period_secs: u64,
    pub min_update_interval_secs: u64,
    pub validator_share_pct: u8,
    pub reset_unlock_after_withdraw: bool,
}

/// File form of [`EmissionParams`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    pub emission_rate: u64,
    pub tail_emission: u64,
    pub halving_period: u64,
}

/// Settings of the local certifier adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifierConfig {
    /// JSON-lines file the outward certifier calls are appended to. Relative
    /// paths are resolved against the data directory.
    #[serde(default = "default_outbox_file")]
    pub outbox_file: PathBuf,

    /// Initial active validator set reported by the adapter.
    #[serde(default)]
    pub active_validators: Vec<Address>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tasknet_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_owner() -> Address {
    Address::new("tn_owner")
}

fn default_outbox_file() -> PathBuf {
    PathBuf::from("certifier_outbox.jsonl")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn outbox_path(&self) -> PathBuf {
        if self.certifier.outbox_file.is_absolute() {
            self.certifier.outbox_file.clone()
        } else {
            self.data_dir.join(&self.certifier.outbox_file)
        }
    }
}

impl GenesisConfig {
    pub fn protocol_params(&self) -> ProtocolParams {
        ProtocolParams {
            version: 0,
            min_stake: u128::from(self.params.min_stake),
            unlock_period_secs: self.params.unlock_period_secs,
            reset_unlock_after_withdraw: self.params.reset_unlock_after_withdraw,
            min_update_interval_secs: self.params.min_update_interval_secs,
            validator_share_pct: self.params.validator_share_pct,
        }
    }

    pub fn emission_params(&self) -> EmissionParams {
        EmissionParams {
            emission_rate: u128::from(self.emission.emission_rate),
            tail_emission: u128::from(self.emission.tail_emission),
            halving_period: self.emission.halving_period,
        }
    }

    pub fn allocations(&self) -> Vec<(Address, u128)> {
        self.allocations
            .iter()
            .map(|a| (a.address.clone(), u128::from(a.amount)))
            .collect()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            map_size_mb: default_map_size_mb(),
            genesis: GenesisConfig::default(),
            certifier: CertifierConfig::default(),
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            certifier: None,
            allocations: Vec::new(),
            params: ParamsConfig::default(),
            emission: EmissionConfig::default(),
        }
    }
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self {
            outbox_file: default_outbox_file(),
            active_validators: Vec::new(),
        }
    }
}

impl Default for ParamsConfig {
    fn default() -> Self {
        let params = ProtocolParams::default();
        Self {
            min_stake: u64::try_from(params.min_stake).unwrap_or(u64::MAX),
            unlock_period_secs: params.unlock_period_secs,
            min_update_interval_secs: params.min_update_interval_secs,
            validator_share_pct: params.validator_share_pct,
            reset_unlock_after_withdraw: params.reset_unlock_after_withdraw,
        }
    }
}

impl Default for EmissionConfig {
    fn default() -> Self {
        let params = EmissionParams::default();
        Self {
            emission_rate: u64::try_from(params.emission_rate).unwrap_or(u64::MAX),
            tail_emission: u64::try_from(params.tail_emission).unwrap_or(u64::MAX),
            halving_period: params.halving_period,
        }
    }
}
