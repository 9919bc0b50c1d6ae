//! Protocol parameters: the versioned configuration record for staking,
//! state-update pacing and the reward split.
//!
//! Emission parameters live with the emission schedule; everything else the
//! ledger consults at run time is here. Privileged changes go through the
//! ledger, which bumps `version` on every mutation.

use serde::{Deserialize, Serialize};

/// All tunable ledger parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Monotonic version, incremented on every privileged change.
    #[serde(default)]
    pub version: u64,

    // ── Staking ──────────────────────────────────────────────────────────
    /// Minimum locked stake for a validator to count as active.
    pub min_stake: u128,

    /// Cooldown between initiating an unlock and being able to withdraw.
    /// Default: 14 days.
    pub unlock_period_secs: u64,

    /// Whether a completed withdrawal returns the validator to the
    /// not-initiated unlock state, so the next unlock restarts the cooldown.
    #[serde(default)]
    pub reset_unlock_after_withdraw: bool,

    // ── State updates ────────────────────────────────────────────────────
    /// Minimum spacing between two accepted state updates. Default: 1 hour.
    pub min_update_interval_secs: u64,

    /// Percentage of each period's reward paid to certifying validators when
    /// workers are present. The remainder goes to workers.
    pub validator_share_pct: u8,
}

impl ProtocolParams {
    pub const UNLOCK_PERIOD_SECS: u64 = 14 * 24 * 3600;
    pub const MIN_UPDATE_INTERVAL_SECS: u64 = 3600;
    pub const VALIDATOR_SHARE_PCT: u8 = 20;

    /// Fast timelines for local development and tests.
    pub fn dev_defaults() -> Self {
        Self {
            unlock_period_secs: 60,
            min_update_interval_secs: 10,
            ..Self::default()
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            version: 0,
            min_stake: 1_000,
            unlock_period_secs: Self::UNLOCK_PERIOD_SECS,
            reset_unlock_after_withdraw: false,
            min_update_interval_secs: Self::MIN_UPDATE_INTERVAL_SECS,
            validator_share_pct: Self::VALIDATOR_SHARE_PCT,
        }
    }
}
