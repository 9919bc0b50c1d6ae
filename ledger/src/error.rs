//! Ledger errors.
//!
//! Three families, none of which leaves a partial write behind: input
//! validation (zero amounts, empty capacity lists, length mismatches),
//! authorization (wrong caller), and state (duplicate job, missing
//! validator, insufficient funds, premature withdrawal, rate limit).

use tasknet_emission::EmissionError;
use tasknet_store::StoreError;
use tasknet_types::{Address, JobId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient stake: need {needed}, locked {locked}")]
    InsufficientStake { needed: u128, locked: u128 },

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("invalid capacity: {0}")]
    InvalidCapacity(&'static str),

    #[error("{workers} workers but {capacities} capacities")]
    InvalidLength { workers: usize, capacities: usize },

    #[error("state update has no certifying validators")]
    NoValidators,

    #[error("no unclaimed rewards for {0}")]
    NoRewards(Address),

    #[error("job {0} already exists")]
    DuplicateJob(JobId),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("caller {0} is not authorized for this operation")]
    UnauthorizedCaller(Address),

    #[error("validator {0} already exists")]
    ValidatorExists(Address),

    #[error("validator {0} not found")]
    ValidatorNotFound(Address),

    #[error("public key hash must be non-zero")]
    InvalidIdentity,

    #[error("stake {amount} is below the minimum of {minimum}")]
    BelowMinimumStake { amount: u128, minimum: u128 },

    #[error("tokens are locked until {unlock_at}")]
    TokensStillLocked { unlock_at: Timestamp },

    #[error("state update not allowed before {next_allowed}")]
    RateLimited { next_allowed: Timestamp },

    #[error("certifier is already set to {0}")]
    CertifierAlreadySet(Address),

    #[error("certifier has not been set")]
    CertifierUnset,

    #[error("arithmetic overflow in ledger computation")]
    Overflow,

    #[error("emission error: {0}")]
    Emission(#[from] EmissionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}
