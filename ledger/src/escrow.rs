//! Job escrow: payments held on behalf of requested jobs until they are
//! cancelled (refunded) or completed (released into the reward pool).

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tasknet_types::{Address, JobId, Timestamp};

/// A requested compute job and its escrowed payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub requester: Address,
    /// Opaque reference chosen by the requester.
    pub user_ref: u64,
    /// Declared resource-capacity requirements, in order. Never empty.
    pub capacities: Vec<u64>,
    pub payment: u128,
    pub requested_at: Timestamp,
}

#[derive(Clone, Debug, Default)]
pub struct JobEscrow {
    jobs: HashMap<JobId, Job>,
    total_escrowed: u128,
    /// Jobs ever requested. Informational only.
    job_count: u64,
}

impl JobEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(jobs: HashMap<JobId, Job>, total_escrowed: u128, job_count: u64) -> Self {
        Self {
            jobs,
            total_escrowed,
            job_count,
        }
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn open_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn total_escrowed(&self) -> u128 {
        self.total_escrowed
    }

    pub fn job_count(&self) -> u64 {
        self.job_count
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &Job)> {
        self.jobs.iter()
    }

    /// Check that a job with `id` and `payment` can be opened.
    pub fn ensure_can_open(&self, id: &JobId, payment: u128) -> Result<(), LedgerError> {
        if self.jobs.contains_key(id) {
            return Err(LedgerError::DuplicateJob(*id));
        }
        self.total_escrowed
            .checked_add(payment)
            .map(|_| ())
            .ok_or(LedgerError::Overflow)
    }

    /// Store a job. Callers must have passed [`ensure_can_open`](Self::ensure_can_open).
    pub fn open(&mut self, id: JobId, job: Job) {
        self.total_escrowed = self.total_escrowed.saturating_add(job.payment);
        self.job_count = self.job_count.saturating_add(1);
        self.jobs.insert(id, job);
    }

    /// Check that `caller` may cancel `id`; returns the refund.
    pub fn authorize_cancel(&self, caller: &Address, id: &JobId) -> Result<u128, LedgerError> {
        let job = self.jobs.get(id).ok_or(LedgerError::JobNotFound(*id))?;
        if &job.requester != caller {
            return Err(LedgerError::UnauthorizedCaller(caller.clone()));
        }
        Ok(job.payment)
    }

    /// Remove a job, returning its record.
    pub fn take(&mut self, id: &JobId) -> Option<Job> {
        let job = self.jobs.remove(id)?;
        self.total_escrowed = self.total_escrowed.saturating_sub(job.payment);
        Some(job)
    }

    /// Release a completed job's payment. Unknown ids release 0.
    pub fn release(&mut self, id: &JobId) -> u128 {
        self.take(id).map(|job| job.payment).unwrap_or(0)
    }
}
