//! Notifications appended to the durable event log for off-ledger observers.

use serde::{Deserialize, Serialize};
use tasknet_types::{Address, JobId, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Transferred {
        from: Address,
        to: Address,
        amount: u128,
    },
    ValidatorCreated {
        validator: Address,
    },
    TokensLocked {
        validator: Address,
        amount: u128,
        total_locked: u128,
    },
    UnlockInitiated {
        validator: Address,
        amount: u128,
        unlock_at: Timestamp,
    },
    TokensUnlocked {
        validator: Address,
        amount: u128,
    },
    JobRequested {
        job_id: JobId,
        user_ref: u64,
        requester: Address,
        payment: u128,
    },
    JobCompleted {
        job_id: JobId,
        reward: u128,
    },
    JobCancelled {
        job_id: JobId,
        requester: Address,
        refund: u128,
    },
    RewardsClaimed {
        account: Address,
        amount: u128,
    },
    StateUpdated(StateUpdateSummary),
    EmissionRateUpdated {
        old_rate: u128,
        new_rate: u128,
        tail_emission: u128,
        halving_period: u64,
    },
    LockAmountChanged {
        old_amount: u128,
        new_amount: u128,
    },
    CertifierSet {
        certifier: Address,
    },
}

impl LedgerEvent {
    /// Short stable name, used for log fields and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Transferred { .. } => "transferred",
            LedgerEvent::ValidatorCreated { .. } => "validator_created",
            LedgerEvent::TokensLocked { .. } => "tokens_locked",
            LedgerEvent::UnlockInitiated { .. } => "unlock_initiated",
            LedgerEvent::TokensUnlocked { .. } => "tokens_unlocked",
            LedgerEvent::JobRequested { .. } => "job_requested",
            LedgerEvent::JobCompleted { .. } => "job_completed",
            LedgerEvent::JobCancelled { .. } => "job_cancelled",
            LedgerEvent::RewardsClaimed { .. } => "rewards_claimed",
            LedgerEvent::StateUpdated(_) => "state_updated",
            LedgerEvent::EmissionRateUpdated { .. } => "emission_rate_updated",
            LedgerEvent::LockAmountChanged { .. } => "lock_amount_changed",
            LedgerEvent::CertifierSet { .. } => "certifier_set",
        }
    }
}

/// Aggregate figures of one accepted state update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdateSummary {
    pub at: Timestamp,
    /// Emission paid this period.
    pub emission: u128,
    /// Payments released from jobs completed in this batch.
    pub job_payments: u128,
    /// Payments released earlier by standalone completions.
    pub carried_pool: u128,
    pub completed_jobs: u64,
    /// Unknown or repeated job ids in the batch.
    pub skipped_jobs: u64,
    pub workers: u64,
    pub validators: u64,
    pub total_capacity: u64,
    pub validator_reward: u128,
    pub worker_reward: u128,
    pub forfeited: u128,
}

impl StateUpdateSummary {
    pub fn total_reward(&self) -> u128 {
        self.emission
            .saturating_add(self.job_payments)
            .saturating_add(self.carried_pool)
    }
}

/// An event with its position in the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub seq: u64,
    pub event: LedgerEvent,
}
