//! Reward distribution.
//!
//! A period's reward (emission plus released job payments) is split between
//! certifying validators and workers and accrued as unclaimed rewards.
//! Shares use floor division; whatever does not divide evenly is forfeited.

use crate::error::LedgerError;
use std::collections::HashMap;
use tasknet_types::Address;

/// How one period's reward was divided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardSplit {
    pub total_reward: u128,
    pub validator_pool: u128,
    pub worker_pool: u128,
    pub validator_shares: Vec<(Address, u128)>,
    pub worker_shares: Vec<(Address, u128)>,
    /// Rounding remainder, never paid out.
    pub forfeited: u128,
}

impl RewardSplit {
    pub fn validator_paid(&self) -> u128 {
        self.validator_shares.iter().map(|(_, s)| *s).sum()
    }

    pub fn worker_paid(&self) -> u128 {
        self.worker_shares.iter().map(|(_, s)| *s).sum()
    }

    pub fn shares(&self) -> impl Iterator<Item = &(Address, u128)> {
        self.validator_shares.iter().chain(self.worker_shares.iter())
    }
}

/// Split `total_reward` among `validators` and `workers`.
///
/// Validators get `validator_share_pct` percent, or everything when there
/// are no workers, split equally. Workers get the rest in proportion to
/// their capacity out of `total_capacity`.
pub fn compute_split(
    total_reward: u128,
    validator_share_pct: u8,
    workers: &[Address],
    capacities: &[u64],
    total_capacity: u64,
    validators: &[Address],
) -> Result<RewardSplit, LedgerError> {
    if validators.is_empty() {
        return Err(LedgerError::NoValidators);
    }
    if workers.len() != capacities.len() {
        return Err(LedgerError::InvalidLength {
            workers: workers.len(),
            capacities: capacities.len(),
        });
    }
    if !workers.is_empty() {
        if total_capacity == 0 {
            return Err(LedgerError::InvalidCapacity("total capacity is zero"));
        }
        let declared = capacities
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(*c))
            .ok_or(LedgerError::Overflow)?;
        if declared > total_capacity {
            return Err(LedgerError::InvalidCapacity(
                "worker capacities exceed total capacity",
            ));
        }
    }

    let validator_pool = if workers.is_empty() {
        total_reward
    } else {
        total_reward
            .checked_mul(u128::from(validator_share_pct.min(100)))
            .ok_or(LedgerError::Overflow)?
            / 100
    };
    let worker_pool = total_reward - validator_pool;

    let per_validator = validator_pool / validators.len() as u128;
    let validator_shares: Vec<(Address, u128)> = validators
        .iter()
        .map(|v| (v.clone(), per_validator))
        .collect();

    let mut worker_shares = Vec::with_capacity(workers.len());
    for (worker, capacity) in workers.iter().zip(capacities) {
        let share = u128::from(*capacity)
            .checked_mul(worker_pool)
            .ok_or(LedgerError::Overflow)?
            / u128::from(total_capacity);
        worker_shares.push((worker.clone(), share));
    }

    let mut split = RewardSplit {
        total_reward,
        validator_pool,
        worker_pool,
        validator_shares,
        worker_shares,
        forfeited: 0,
    };
    split.forfeited = total_reward - split.validator_paid() - split.worker_paid();
    Ok(split)
}

/// Accrued, unclaimed rewards per address.
#[derive(Clone, Debug, Default)]
pub struct RewardBook {
    unclaimed: HashMap<Address, u128>,
    total_unclaimed: u128,
    total_forfeited: u128,
}

impl RewardBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        unclaimed: HashMap<Address, u128>,
        total_unclaimed: u128,
        total_forfeited: u128,
    ) -> Self {
        Self {
            unclaimed,
            total_unclaimed,
            total_forfeited,
        }
    }

    pub fn unclaimed(&self, address: &Address) -> u128 {
        self.unclaimed.get(address).copied().unwrap_or(0)
    }

    pub fn total_unclaimed(&self) -> u128 {
        self.total_unclaimed
    }

    pub fn total_forfeited(&self) -> u128 {
        self.total_forfeited
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.unclaimed.iter()
    }

    /// Check that crediting `split` cannot overflow any accumulator.
    pub fn ensure_capacity(&self, split: &RewardSplit) -> Result<(), LedgerError> {
        let mut pending: HashMap<&Address, u128> = HashMap::new();
        for (address, share) in split.shares() {
            let entry = pending
                .entry(address)
                .or_insert_with(|| self.unclaimed(address));
            *entry = entry.checked_add(*share).ok_or(LedgerError::Overflow)?;
        }
        self.total_unclaimed
            .checked_add(split.validator_paid())
            .and_then(|t| t.checked_add(split.worker_paid()))
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Accrue every non-zero share. Returns the addresses credited.
    pub fn credit(&mut self, split: &RewardSplit) -> Vec<Address> {
        let mut credited = Vec::new();
        for (address, share) in split.shares() {
            if *share == 0 {
                continue;
            }
            let entry = self.unclaimed.entry(address.clone()).or_insert(0);
            *entry = entry.saturating_add(*share);
            self.total_unclaimed = self.total_unclaimed.saturating_add(*share);
            credited.push(address.clone());
        }
        self.total_forfeited = self.total_forfeited.saturating_add(split.forfeited);
        credited
    }

    /// Zero `address`'s accumulator and return what it held.
    pub fn take(&mut self, address: &Address) -> Result<u128, LedgerError> {
        match self.unclaimed.remove(address) {
            Some(amount) if amount > 0 => {
                self.total_unclaimed = self.total_unclaimed.saturating_sub(amount);
                Ok(amount)
            }
            _ => Err(LedgerError::NoRewards(address.clone())),
        }
    }
}
