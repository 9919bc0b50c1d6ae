//! Per-operation record of what changed.
//!
//! The host drains the journal after every accepted operation and turns it
//! into one atomic store write, then dispatches the queued certifier calls.

use crate::event::RecordedEvent;
use std::collections::BTreeSet;
use tasknet_types::{Address, CertifierCall, JobId};

#[derive(Clone, Debug, Default)]
pub struct Journal {
    pub balances: BTreeSet<Address>,
    pub jobs: BTreeSet<JobId>,
    pub validators: BTreeSet<Address>,
    pub rewards: BTreeSet<Address>,
    pub events: Vec<RecordedEvent>,
    pub certifier_calls: Vec<CertifierCall>,
}

impl Journal {
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
            && self.jobs.is_empty()
            && self.validators.is_empty()
            && self.rewards.is_empty()
            && self.events.is_empty()
            && self.certifier_calls.is_empty()
    }
}
