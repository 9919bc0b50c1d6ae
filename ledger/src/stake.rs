//! Validator stake registry.
//!
//! Stake moves from a validator's spendable balance into custody on lock and
//! back out through a two-phase unlock: the first call starts a cooldown, any
//! later call withdraws once the cooldown has elapsed.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tasknet_types::{Address, ProtocolParams, PublicKeyHash, Timestamp};

/// Where a validator is in the two-phase unlock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockState {
    #[default]
    NotInitiated,
    /// Cooldown started; withdrawals are allowed from `unlock_at` on.
    Pending { unlock_at: Timestamp },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Identity commitment, bound once at creation. Never zero.
    pub public_key_hash: PublicKeyHash,
    /// Stake held in custody.
    pub locked: u128,
    pub unlock: UnlockState,
    pub created_at: Timestamp,
}

/// Result of an accepted unlock call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Phase 1: the cooldown started. No tokens moved.
    Initiated {
        unlock_at: Timestamp,
        amount: u128,
        /// The validator no longer meets the minimum stake.
        deactivated: bool,
    },
    /// Phase 2: `amount` went back to the validator's balance.
    Withdrawn {
        amount: u128,
        remaining: u128,
        deactivated: bool,
    },
}

impl UnlockOutcome {
    pub fn deactivated(&self) -> bool {
        match self {
            UnlockOutcome::Initiated { deactivated, .. } => *deactivated,
            UnlockOutcome::Withdrawn { deactivated, .. } => *deactivated,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StakeRegistry {
    validators: HashMap<Address, Validator>,
    /// Stake counted as active collateral. Reduced when an unlock starts.
    total_locked: u128,
    /// Stake physically held, reduced only on withdrawal.
    total_custody: u128,
    validator_count: u64,
}

impl StakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        validators: HashMap<Address, Validator>,
        total_locked: u128,
        total_custody: u128,
        validator_count: u64,
    ) -> Self {
        Self {
            validators,
            total_locked,
            total_custody,
            validator_count,
        }
    }

    pub fn get(&self, address: &Address) -> Option<&Validator> {
        self.validators.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Validator)> {
        self.validators.iter()
    }

    pub fn total_locked(&self) -> u128 {
        self.total_locked
    }

    pub fn total_custody(&self) -> u128 {
        self.total_custody
    }

    pub fn validator_count(&self) -> u64 {
        self.validator_count
    }

    /// True iff the validator's locked stake meets `min_stake`.
    pub fn is_locked(&self, address: &Address, min_stake: u128) -> bool {
        self.validators
            .get(address)
            .is_some_and(|v| v.locked >= min_stake)
    }

    pub fn ensure_can_register(&self, address: &Address, pkh: &PublicKeyHash) -> Result<(), LedgerError> {
        if pkh.is_zero() {
            return Err(LedgerError::InvalidIdentity);
        }
        if self.validators.contains_key(address) {
            return Err(LedgerError::ValidatorExists(address.clone()));
        }
        Ok(())
    }

    /// Create a validator record with nothing locked.
    pub fn register(&mut self, address: Address, pkh: PublicKeyHash, now: Timestamp) {
        self.validators.insert(
            address,
            Validator {
                public_key_hash: pkh,
                locked: 0,
                unlock: UnlockState::NotInitiated,
                created_at: now,
            },
        );
        self.validator_count = self.validator_count.saturating_add(1);
    }

    /// Check a lock of `amount` against the registry. Balance checks are the
    /// caller's concern.
    pub fn validate_lock(&self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        let validator = self
            .validators
            .get(address)
            .ok_or_else(|| LedgerError::ValidatorNotFound(address.clone()))?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        Self::check_add(validator.locked, amount)?;
        self.ensure_totals(amount)
    }

    /// Check that the registry totals can absorb another `amount`.
    pub fn ensure_totals(&self, amount: u128) -> Result<(), LedgerError> {
        Self::check_add(self.total_locked, amount)?;
        Self::check_add(self.total_custody, amount)?;
        Ok(())
    }

    /// Move `amount` into custody. Returns the new total locked.
    pub fn lock(&mut self, address: &Address, amount: u128) -> Result<u128, LedgerError> {
        self.validate_lock(address, amount)?;
        if let Some(validator) = self.validators.get_mut(address) {
            validator.locked += amount;
        }
        self.total_locked += amount;
        self.total_custody += amount;
        Ok(self.total_locked)
    }

    /// Decide what an unlock call does without changing anything.
    pub fn plan_unlock(
        &self,
        address: &Address,
        amount: u128,
        now: Timestamp,
        params: &ProtocolParams,
    ) -> Result<UnlockOutcome, LedgerError> {
        let validator = self
            .validators
            .get(address)
            .ok_or_else(|| LedgerError::ValidatorNotFound(address.clone()))?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if amount > validator.locked {
            return Err(LedgerError::InsufficientStake {
                needed: amount,
                locked: validator.locked,
            });
        }
        match validator.unlock {
            UnlockState::NotInitiated => Ok(UnlockOutcome::Initiated {
                unlock_at: now.plus_secs(params.unlock_period_secs),
                amount,
                deactivated: validator.locked < params.min_stake,
            }),
            UnlockState::Pending { unlock_at } => {
                if now < unlock_at {
                    return Err(LedgerError::TokensStillLocked { unlock_at });
                }
                let remaining = validator.locked - amount;
                Ok(UnlockOutcome::Withdrawn {
                    amount,
                    remaining,
                    deactivated: remaining < params.min_stake,
                })
            }
        }
    }

    /// Apply an outcome produced by [`plan_unlock`](Self::plan_unlock) for
    /// the same validator.
    pub fn apply_unlock(&mut self, address: &Address, outcome: &UnlockOutcome, params: &ProtocolParams) {
        let Some(validator) = self.validators.get_mut(address) else {
            return;
        };
        match *outcome {
            UnlockOutcome::Initiated { unlock_at, amount, .. } => {
                validator.unlock = UnlockState::Pending { unlock_at };
                self.total_locked = self.total_locked.saturating_sub(amount);
            }
            UnlockOutcome::Withdrawn { amount, remaining, .. } => {
                validator.locked = remaining;
                if params.reset_unlock_after_withdraw {
                    validator.unlock = UnlockState::NotInitiated;
                }
                self.total_custody = self.total_custody.saturating_sub(amount);
            }
        }
    }

    fn check_add(a: u128, b: u128) -> Result<u128, LedgerError> {
        a.checked_add(b).ok_or(LedgerError::Overflow)
    }
}
