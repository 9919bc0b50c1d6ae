//! The external certifier collaborator.
//!
//! The certifier (a multisig / consensus component outside this workspace)
//! collects validator attestations and submits state updates. The ledger in
//! turn tells it when a validator drops out of the active set and when the
//! halving period changes, so its own timing assumptions stay consistent.

use crate::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An outward call the ledger owes the certifier after a committed change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertifierCall {
    /// The validator's locked stake fell below the minimum.
    RemoveValidator(Address),
    /// The state-update period was halved (`halve_state_time`).
    HalvePeriod,
    /// The state-update period was doubled (`double_state_time`).
    DoublePeriod,
}

#[derive(Debug, Error)]
pub enum CertifierError {
    #[error("certifier unavailable: {0}")]
    Unavailable(String),

    #[error("certifier rejected call: {0}")]
    Rejected(String),
}

/// Interface of the certifier component as seen from the ledger host.
pub trait CertifierRegistry: Send + Sync {
    fn remove_validator(&self, validator: &Address) -> Result<(), CertifierError>;
    fn halve_period(&self) -> Result<(), CertifierError>;
    fn double_period(&self) -> Result<(), CertifierError>;

    /// Number of validators in the certifier's active set.
    fn num_validators(&self) -> u64;
    fn is_active_validator(&self, validator: &Address) -> bool;

    /// Dispatch a queued [`CertifierCall`].
    fn dispatch(&self, call: &CertifierCall) -> Result<(), CertifierError> {
        match call {
            CertifierCall::RemoveValidator(v) => self.remove_validator(v),
            CertifierCall::HalvePeriod => self.halve_period(),
            CertifierCall::DoublePeriod => self.double_period(),
        }
    }
}
