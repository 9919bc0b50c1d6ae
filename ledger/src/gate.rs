//! State update gate: who may submit state updates, and how often.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use tasknet_types::{Address, JobId, Timestamp};

/// The certifier address, settable exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertifierSlot {
    #[default]
    Unset,
    Set(Address),
}

impl CertifierSlot {
    pub fn address(&self) -> Option<&Address> {
        match self {
            CertifierSlot::Unset => None,
            CertifierSlot::Set(address) => Some(address),
        }
    }
}

/// A certified batch, as submitted by the certifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default)]
    pub completed_jobs: Vec<JobId>,
    #[serde(default)]
    pub workers: Vec<Address>,
    #[serde(default)]
    pub capacities: Vec<u64>,
    #[serde(default)]
    pub total_capacity: u64,
    pub validators: Vec<Address>,
}

impl StateUpdate {
    /// Shape checks that need no ledger state.
    pub fn validate_shape(&self) -> Result<(), LedgerError> {
        if self.workers.len() != self.capacities.len() {
            return Err(LedgerError::InvalidLength {
                workers: self.workers.len(),
                capacities: self.capacities.len(),
            });
        }
        if self.validators.is_empty() {
            return Err(LedgerError::NoValidators);
        }
        if !self.workers.is_empty() && self.total_capacity == 0 {
            return Err(LedgerError::InvalidCapacity("total capacity is zero"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdateGate {
    certifier: CertifierSlot,
    last_update: Option<Timestamp>,
}

impl StateUpdateGate {
    pub fn new(certifier: CertifierSlot) -> Self {
        Self {
            certifier,
            last_update: None,
        }
    }

    pub fn certifier(&self) -> &CertifierSlot {
        &self.certifier
    }

    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    pub fn set_certifier(&mut self, certifier: Address) -> Result<(), LedgerError> {
        if let CertifierSlot::Set(existing) = &self.certifier {
            return Err(LedgerError::CertifierAlreadySet(existing.clone()));
        }
        self.certifier = CertifierSlot::Set(certifier);
        Ok(())
    }

    /// Only the configured certifier may pass.
    pub fn authorize(&self, caller: &Address) -> Result<(), LedgerError> {
        match &self.certifier {
            CertifierSlot::Unset => Err(LedgerError::CertifierUnset),
            CertifierSlot::Set(certifier) if certifier == caller => Ok(()),
            CertifierSlot::Set(_) => Err(LedgerError::UnauthorizedCaller(caller.clone())),
        }
    }

    /// At most one accepted update per `interval_secs`, measured from the
    /// last accepted one. A clock that went backwards is also rejected.
    pub fn check_rate(&self, now: Timestamp, interval_secs: u64) -> Result<(), LedgerError> {
        if let Some(last) = self.last_update {
            if now < last || !last.has_expired(interval_secs, now) {
                return Err(LedgerError::RateLimited {
                    next_allowed: last.plus_secs(interval_secs),
                });
            }
        }
        Ok(())
    }

    pub fn record(&mut self, now: Timestamp) {
        self.last_update = Some(now);
    }
}
