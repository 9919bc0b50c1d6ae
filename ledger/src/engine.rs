//! The ledger: every entry point that changes balances, escrow, stake or
//! rewards.
//!
//! Each operation validates completely against the current state before it
//! mutates anything. Accepted operations leave a [`Journal`] behind that the
//! host drains with [`Ledger::take_journal`].

use crate::balances::BalanceSheet;
use crate::error::LedgerError;
use crate::escrow::{Job, JobEscrow};
use crate::event::{LedgerEvent, RecordedEvent, StateUpdateSummary};
use crate::gate::{CertifierSlot, StateUpdate, StateUpdateGate};
use crate::journal::Journal;
use crate::rewards::{compute_split, RewardBook};
use crate::stake::{StakeRegistry, UnlockOutcome, Validator};
use std::collections::HashSet;
use tasknet_emission::{EmissionParams, EmissionSchedule};
use tasknet_types::{Address, CertifierCall, JobId, ProtocolParams, PublicKeyHash, Timestamp};

/// Supply figures at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConservationReport {
    pub total_supply: u128,
    pub balances: u128,
    pub escrowed: u128,
    pub custody: u128,
    pub unclaimed: u128,
    pub reward_pool: u128,
}

impl ConservationReport {
    /// `total_supply == Σbalances + Σescrow + Σcustody`.
    pub fn holds(&self) -> bool {
        self.balances
            .checked_add(self.escrowed)
            .and_then(|s| s.checked_add(self.custody))
            == Some(self.total_supply)
    }

    /// Tokens materialized or owed: supply plus accrued rewards and the
    /// undistributed pool.
    pub fn issued(&self) -> u128 {
        self.total_supply
            .saturating_add(self.unclaimed)
            .saturating_add(self.reward_pool)
    }
}

pub struct Ledger {
    pub(crate) owner: Address,
    pub(crate) params: ProtocolParams,
    pub(crate) balances: BalanceSheet,
    pub(crate) escrow: JobEscrow,
    pub(crate) stakes: StakeRegistry,
    pub(crate) rewards: RewardBook,
    pub(crate) emission: EmissionSchedule,
    pub(crate) gate: StateUpdateGate,
    /// Payments released by standalone completions, distributed by the next
    /// state update.
    pub(crate) reward_pool: u128,
    pub(crate) event_seq: u64,
    pub(crate) journal: Journal,
}

impl Ledger {
    /// Create a ledger and mint the genesis allocations.
    pub fn genesis(
        owner: Address,
        params: ProtocolParams,
        emission: EmissionParams,
        certifier: Option<Address>,
        allocations: &[(Address, u128)],
    ) -> Result<Self, LedgerError> {
        let certifier = match certifier {
            Some(address) => CertifierSlot::Set(address),
            None => CertifierSlot::Unset,
        };
        let mut ledger = Self {
            owner,
            params,
            balances: BalanceSheet::new(),
            escrow: JobEscrow::new(),
            stakes: StakeRegistry::new(),
            rewards: RewardBook::new(),
            emission: EmissionSchedule::new(emission)?,
            gate: StateUpdateGate::new(certifier),
            reward_pool: 0,
            event_seq: 0,
            journal: Journal::default(),
        };
        for (address, amount) in allocations {
            ledger.balances.mint(address, *amount)?;
            ledger.journal.balances.insert(address.clone());
        }
        tracing::info!(
            owner = %ledger.owner,
            allocations = allocations.len(),
            total_supply = ledger.balances.total_supply(),
            "ledger genesis"
        );
        Ok(ledger)
    }

    /// Drain the record of changes made since the last call.
    pub fn take_journal(&mut self) -> Journal {
        std::mem::take(&mut self.journal)
    }

    pub fn discard_journal(&mut self) {
        self.journal = Journal::default();
    }

    fn emit(&mut self, event: LedgerEvent) {
        let seq = self.event_seq;
        self.event_seq += 1;
        tracing::debug!(seq, event = event.name(), "ledger event");
        self.journal.events.push(RecordedEvent { seq, event });
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if caller != &self.owner {
            return Err(LedgerError::UnauthorizedCaller(caller.clone()));
        }
        Ok(())
    }

    // ── Balances ─────────────────────────────────────────────────────────

    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        self.balances.transfer(caller, to, amount)?;
        self.journal.balances.insert(caller.clone());
        self.journal.balances.insert(to.clone());
        self.emit(LedgerEvent::Transferred {
            from: caller.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    // ── Job escrow ───────────────────────────────────────────────────────

    pub fn request_job(
        &mut self,
        caller: &Address,
        user_ref: u64,
        job_id: JobId,
        capacities: Vec<u64>,
        payment: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if capacities.is_empty() {
            return Err(LedgerError::InvalidCapacity("job declares no capacities"));
        }
        if payment == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.balances.ensure_available(caller, payment)?;
        self.escrow.ensure_can_open(&job_id, payment)?;

        self.balances.debit(caller, payment)?;
        self.escrow.open(
            job_id,
            Job {
                requester: caller.clone(),
                user_ref,
                capacities,
                payment,
                requested_at: now,
            },
        );
        self.journal.balances.insert(caller.clone());
        self.journal.jobs.insert(job_id);
        self.emit(LedgerEvent::JobRequested {
            job_id,
            user_ref,
            requester: caller.clone(),
            payment,
        });
        Ok(())
    }

    /// Cancel a job and refund its requester. Returns the refund.
    pub fn cancel_job(&mut self, caller: &Address, job_id: &JobId) -> Result<u128, LedgerError> {
        let refund = self.escrow.authorize_cancel(caller, job_id)?;
        self.balances.ensure_credit(caller, refund)?;

        self.escrow.take(job_id);
        self.balances.credit(caller, refund)?;
        self.journal.balances.insert(caller.clone());
        self.journal.jobs.insert(*job_id);
        self.emit(LedgerEvent::JobCancelled {
            job_id: *job_id,
            requester: caller.clone(),
            refund,
        });
        Ok(refund)
    }

    /// Release a job's payment into the reward pool. Certifier only.
    ///
    /// Unknown ids release 0 and change nothing.
    pub fn complete_job(&mut self, caller: &Address, job_id: &JobId) -> Result<u128, LedgerError> {
        self.gate.authorize(caller)?;
        let Some(payment) = self.escrow.get(job_id).map(|job| job.payment) else {
            return Ok(0);
        };
        let pool = self
            .reward_pool
            .checked_add(payment)
            .ok_or(LedgerError::Overflow)?;

        self.balances.retire(payment)?;
        self.escrow.release(job_id);
        self.reward_pool = pool;
        self.journal.jobs.insert(*job_id);
        self.emit(LedgerEvent::JobCompleted {
            job_id: *job_id,
            reward: payment,
        });
        Ok(payment)
    }

    // ── Validator stake ──────────────────────────────────────────────────

    pub fn create_validator(
        &mut self,
        caller: &Address,
        public_key_hash: PublicKeyHash,
        initial_lock: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.stakes.ensure_can_register(caller, &public_key_hash)?;
        if initial_lock < self.params.min_stake {
            return Err(LedgerError::BelowMinimumStake {
                amount: initial_lock,
                minimum: self.params.min_stake,
            });
        }
        if initial_lock == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.balances.ensure_available(caller, initial_lock)?;
        self.stakes.ensure_totals(initial_lock)?;

        self.stakes.register(caller.clone(), public_key_hash, now);
        self.balances.debit(caller, initial_lock)?;
        let total_locked = self.stakes.lock(caller, initial_lock)?;
        self.journal.balances.insert(caller.clone());
        self.journal.validators.insert(caller.clone());
        self.emit(LedgerEvent::ValidatorCreated {
            validator: caller.clone(),
        });
        self.emit(LedgerEvent::TokensLocked {
            validator: caller.clone(),
            amount: initial_lock,
            total_locked,
        });
        Ok(())
    }

    pub fn lock_tokens(&mut self, caller: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.stakes.validate_lock(caller, amount)?;
        self.balances.ensure_available(caller, amount)?;

        self.balances.debit(caller, amount)?;
        let total_locked = self.stakes.lock(caller, amount)?;
        self.journal.balances.insert(caller.clone());
        self.journal.validators.insert(caller.clone());
        self.emit(LedgerEvent::TokensLocked {
            validator: caller.clone(),
            amount,
            total_locked,
        });
        Ok(())
    }

    /// Start an unlock, or withdraw once the cooldown has elapsed.
    pub fn unlock_tokens(
        &mut self,
        caller: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<UnlockOutcome, LedgerError> {
        let outcome = self.stakes.plan_unlock(caller, amount, now, &self.params)?;
        if let UnlockOutcome::Withdrawn { amount, .. } = outcome {
            self.balances.ensure_credit(caller, amount)?;
        }

        self.stakes.apply_unlock(caller, &outcome, &self.params);
        self.journal.validators.insert(caller.clone());
        match outcome {
            UnlockOutcome::Initiated { unlock_at, amount, .. } => {
                self.emit(LedgerEvent::UnlockInitiated {
                    validator: caller.clone(),
                    amount,
                    unlock_at,
                });
            }
            UnlockOutcome::Withdrawn { amount, .. } => {
                self.balances.credit(caller, amount)?;
                self.journal.balances.insert(caller.clone());
                self.emit(LedgerEvent::TokensUnlocked {
                    validator: caller.clone(),
                    amount,
                });
            }
        }
        if outcome.deactivated() {
            tracing::info!(validator = %caller, "validator below minimum stake");
            self.journal
                .certifier_calls
                .push(CertifierCall::RemoveValidator(caller.clone()));
        }
        Ok(outcome)
    }

    // ── Rewards ──────────────────────────────────────────────────────────

    /// Mint the caller's unclaimed rewards into their balance.
    pub fn claim_rewards(&mut self, caller: &Address) -> Result<u128, LedgerError> {
        let amount = self.rewards.unclaimed(caller);
        if amount == 0 {
            return Err(LedgerError::NoRewards(caller.clone()));
        }
        self.balances.mint(caller, amount)?;
        self.rewards.take(caller)?;
        self.journal.balances.insert(caller.clone());
        self.journal.rewards.insert(caller.clone());
        self.emit(LedgerEvent::RewardsClaimed {
            account: caller.clone(),
            amount,
        });
        Ok(amount)
    }

    // ── State updates ────────────────────────────────────────────────────

    /// Accept a certified batch: release completed jobs, pay the period's
    /// emission and distribute everything as unclaimed rewards.
    pub fn update_contract(
        &mut self,
        caller: &Address,
        update: &StateUpdate,
        now: Timestamp,
    ) -> Result<StateUpdateSummary, LedgerError> {
        self.gate.authorize(caller)?;
        self.gate
            .check_rate(now, self.params.min_update_interval_secs)?;
        update.validate_shape()?;

        let mut schedule = self.emission;
        let period = schedule.begin_period();

        let mut seen = HashSet::new();
        let mut releases = Vec::new();
        let mut job_payments: u128 = 0;
        let mut skipped_jobs: u64 = 0;
        for job_id in &update.completed_jobs {
            let payment = match self.escrow.get(job_id) {
                Some(job) if seen.insert(*job_id) => job.payment,
                _ => {
                    skipped_jobs += 1;
                    continue;
                }
            };
            job_payments = job_payments
                .checked_add(payment)
                .ok_or(LedgerError::Overflow)?;
            releases.push((*job_id, payment));
        }

        let total_reward = period
            .amount
            .checked_add(job_payments)
            .and_then(|t| t.checked_add(self.reward_pool))
            .ok_or(LedgerError::Overflow)?;
        let split = compute_split(
            total_reward,
            self.params.validator_share_pct,
            &update.workers,
            &update.capacities,
            update.total_capacity,
            &update.validators,
        )?;
        self.rewards.ensure_capacity(&split)?;

        // Validated; apply.
        if let Some((old_rate, new_rate)) = period.halved {
            tracing::info!(old_rate, new_rate, "emission rate halved");
            self.emit(LedgerEvent::EmissionRateUpdated {
                old_rate,
                new_rate,
                tail_emission: schedule.tail_emission(),
                halving_period: schedule.halving_period(),
            });
        }
        self.balances.retire(job_payments)?;
        for (job_id, payment) in &releases {
            self.escrow.release(job_id);
            self.journal.jobs.insert(*job_id);
            self.emit(LedgerEvent::JobCompleted {
                job_id: *job_id,
                reward: *payment,
            });
        }
        let carried_pool = std::mem::take(&mut self.reward_pool);
        for address in self.rewards.credit(&split) {
            self.journal.rewards.insert(address);
        }
        schedule.advance();
        self.emission = schedule;
        self.gate.record(now);

        let summary = StateUpdateSummary {
            at: now,
            emission: period.amount,
            job_payments,
            carried_pool,
            completed_jobs: releases.len() as u64,
            skipped_jobs,
            workers: update.workers.len() as u64,
            validators: update.validators.len() as u64,
            total_capacity: update.total_capacity,
            validator_reward: split.validator_paid(),
            worker_reward: split.worker_paid(),
            forfeited: split.forfeited,
        };
        tracing::info!(
            emission = summary.emission,
            job_payments,
            completed = summary.completed_jobs,
            skipped = skipped_jobs,
            validators = summary.validators,
            workers = summary.workers,
            forfeited = summary.forfeited,
            "state update accepted"
        );
        self.emit(LedgerEvent::StateUpdated(summary.clone()));
        Ok(summary)
    }

    // ── Owner operations ─────────────────────────────────────────────────

    pub fn set_certifier(&mut self, caller: &Address, certifier: Address) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.gate.set_certifier(certifier.clone())?;
        tracing::info!(certifier = %certifier, "certifier set");
        self.emit(LedgerEvent::CertifierSet { certifier });
        Ok(())
    }

    /// Halve emission and tail, double the halving period.
    pub fn halve_state_time(&mut self, caller: &Address) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        let mut schedule = self.emission;
        schedule.halve_state_time()?;
        self.apply_schedule(schedule, CertifierCall::HalvePeriod);
        Ok(())
    }

    /// Double emission and tail, halve the halving period.
    pub fn double_state_time(&mut self, caller: &Address) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        let mut schedule = self.emission;
        schedule.double_state_time()?;
        self.apply_schedule(schedule, CertifierCall::DoublePeriod);
        Ok(())
    }

    fn apply_schedule(&mut self, schedule: EmissionSchedule, call: CertifierCall) {
        let old_rate = self.emission.emission_rate();
        self.emission = schedule;
        tracing::info!(
            old_rate,
            new_rate = schedule.emission_rate(),
            halving_period = schedule.halving_period(),
            "emission schedule changed"
        );
        self.emit(LedgerEvent::EmissionRateUpdated {
            old_rate,
            new_rate: schedule.emission_rate(),
            tail_emission: schedule.tail_emission(),
            halving_period: schedule.halving_period(),
        });
        self.journal.certifier_calls.push(call);
    }

    /// Change the minimum validator stake.
    pub fn set_lock_amount(&mut self, caller: &Address, amount: u128) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let old_amount = self.params.min_stake;
        self.params.min_stake = amount;
        self.params.version += 1;
        tracing::info!(old_amount, new_amount = amount, "minimum stake changed");
        self.emit(LedgerEvent::LockAmountChanged {
            old_amount,
            new_amount: amount,
        });
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn certifier(&self) -> Option<&Address> {
        self.gate.certifier().address()
    }

    pub fn last_update(&self) -> Option<Timestamp> {
        self.gate.last_update()
    }

    pub fn emission(&self) -> &EmissionSchedule {
        &self.emission
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.balance_of(address)
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.total_supply()
    }

    pub fn job(&self, job_id: &JobId) -> Option<&Job> {
        self.escrow.get(job_id)
    }

    pub fn open_jobs(&self) -> usize {
        self.escrow.open_jobs()
    }

    pub fn job_count(&self) -> u64 {
        self.escrow.job_count()
    }

    pub fn total_escrowed(&self) -> u128 {
        self.escrow.total_escrowed()
    }

    pub fn validator(&self, address: &Address) -> Option<&Validator> {
        self.stakes.get(address)
    }

    pub fn validator_count(&self) -> u64 {
        self.stakes.validator_count()
    }

    pub fn is_locked(&self, address: &Address) -> bool {
        self.stakes.is_locked(address, self.params.min_stake)
    }

    pub fn total_locked(&self) -> u128 {
        self.stakes.total_locked()
    }

    pub fn total_custody(&self) -> u128 {
        self.stakes.total_custody()
    }

    pub fn unclaimed_rewards(&self, address: &Address) -> u128 {
        self.rewards.unclaimed(address)
    }

    pub fn total_unclaimed(&self) -> u128 {
        self.rewards.total_unclaimed()
    }

    pub fn total_forfeited(&self) -> u128 {
        self.rewards.total_forfeited()
    }

    pub fn reward_pool(&self) -> u128 {
        self.reward_pool
    }

    /// Sequence number the next event will get.
    pub fn next_event_seq(&self) -> u64 {
        self.event_seq
    }

    pub fn conservation(&self) -> ConservationReport {
        ConservationReport {
            total_supply: self.balances.total_supply(),
            balances: self.balances.sum_of_balances(),
            escrowed: self.escrow.total_escrowed(),
            custody: self.stakes.total_custody(),
            unclaimed: self.rewards.total_unclaimed(),
            reward_pool: self.reward_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(name: &str) -> Address {
        Address::new(format!("tn_{name}"))
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::genesis(
            addr("owner"),
            ProtocolParams::default(),
            EmissionParams {
                emission_rate: 100,
                tail_emission: 10,
                halving_period: 4,
            },
            Some(addr("cert")),
            &[(addr("alice"), 10_000), (addr("val"), 5_000)],
        )
        .unwrap();
        ledger.discard_journal();
        ledger
    }

    fn update(validators: &[&str]) -> StateUpdate {
        StateUpdate {
            validators: validators.iter().map(|v| addr(v)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejected_operation_leaves_no_journal() {
        let mut ledger = ledger();
        let result = ledger.request_job(&addr("alice"), 1, JobId::digest(b"j"), vec![], 10, Timestamp::new(0));
        assert!(matches!(result, Err(LedgerError::InvalidCapacity(_))));
        assert!(ledger.take_journal().is_empty());
        assert!(ledger.conservation().holds());
    }

    #[test]
    fn test_request_job_error_order() {
        let mut ledger = ledger();
        let id = JobId::digest(b"j");
        let now = Timestamp::new(0);
        assert!(matches!(
            ledger.request_job(&addr("alice"), 1, id, vec![1], 0, now),
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.request_job(&addr("alice"), 1, id, vec![1], 10_001, now),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        ledger.request_job(&addr("alice"), 1, id, vec![1], 100, now).unwrap();
        assert!(matches!(
            ledger.request_job(&addr("alice"), 1, id, vec![1], 100, now),
            Err(LedgerError::DuplicateJob(_))
        ));
    }

    #[test]
    fn test_complete_job_is_certifier_only_and_tolerant() {
        let mut ledger = ledger();
        let id = JobId::digest(b"j");
        ledger.request_job(&addr("alice"), 1, id, vec![2], 300, Timestamp::new(0)).unwrap();
        ledger.discard_journal();

        assert!(matches!(
            ledger.complete_job(&addr("alice"), &id),
            Err(LedgerError::UnauthorizedCaller(_))
        ));
        assert_eq!(ledger.complete_job(&addr("cert"), &id).unwrap(), 300);
        assert_eq!(ledger.reward_pool(), 300);
        assert_eq!(ledger.total_supply(), 14_700);
        ledger.discard_journal();

        assert_eq!(ledger.complete_job(&addr("cert"), &id).unwrap(), 0);
        assert!(ledger.take_journal().is_empty());
        assert!(ledger.conservation().holds());
    }

    #[test]
    fn test_carried_pool_is_distributed_by_next_update() {
        let mut ledger = ledger();
        let id = JobId::digest(b"j");
        ledger.request_job(&addr("alice"), 1, id, vec![2], 300, Timestamp::new(0)).unwrap();
        ledger.complete_job(&addr("cert"), &id).unwrap();

        let summary = ledger
            .update_contract(&addr("cert"), &update(&["val"]), Timestamp::new(0))
            .unwrap();
        assert_eq!(summary.carried_pool, 300);
        assert_eq!(summary.total_reward(), 400);
        assert_eq!(ledger.unclaimed_rewards(&addr("val")), 400);
        assert_eq!(ledger.reward_pool(), 0);
    }

    #[test]
    fn test_create_validator_error_order() {
        let mut ledger = ledger();
        let now = Timestamp::new(0);
        assert!(matches!(
            ledger.create_validator(&addr("val"), PublicKeyHash::ZERO, 1_000, now),
            Err(LedgerError::InvalidIdentity)
        ));
        assert!(matches!(
            ledger.create_validator(&addr("val"), PublicKeyHash::new([1; 32]), 999, now),
            Err(LedgerError::BelowMinimumStake { amount: 999, minimum: 1_000 })
        ));
        assert!(matches!(
            ledger.create_validator(&addr("val"), PublicKeyHash::new([1; 32]), 5_001, now),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        ledger
            .create_validator(&addr("val"), PublicKeyHash::new([1; 32]), 2_000, now)
            .unwrap();
        assert!(matches!(
            ledger.create_validator(&addr("val"), PublicKeyHash::new([2; 32]), 1_000, now),
            Err(LedgerError::ValidatorExists(_))
        ));
        assert_eq!(ledger.validator_count(), 1);
        assert!(ledger.is_locked(&addr("val")));
    }

    #[test]
    fn test_unlock_below_minimum_queues_removal() {
        let mut ledger = ledger();
        let now = Timestamp::new(0);
        ledger
            .create_validator(&addr("val"), PublicKeyHash::new([1; 32]), 1_500, now)
            .unwrap();
        ledger.unlock_tokens(&addr("val"), 1_000, now).unwrap();
        ledger.discard_journal();

        let later = now.plus_secs(ledger.params().unlock_period_secs);
        ledger.unlock_tokens(&addr("val"), 1_000, later).unwrap();
        let journal = ledger.take_journal();
        assert_eq!(
            journal.certifier_calls,
            vec![CertifierCall::RemoveValidator(addr("val"))]
        );
        assert_eq!(ledger.balance_of(&addr("val")), 4_500);
    }

    #[test]
    fn test_update_requires_certifier_and_rate() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.update_contract(&addr("alice"), &update(&["val"]), Timestamp::new(0)),
            Err(LedgerError::UnauthorizedCaller(_))
        ));
        ledger
            .update_contract(&addr("cert"), &update(&["val"]), Timestamp::new(0))
            .unwrap();
        assert!(matches!(
            ledger.update_contract(&addr("cert"), &update(&["val"]), Timestamp::new(3_599)),
            Err(LedgerError::RateLimited { .. })
        ));
        ledger
            .update_contract(&addr("cert"), &update(&["val"]), Timestamp::new(3_600))
            .unwrap();
    }

    #[test]
    fn test_failed_split_does_not_advance_emission() {
        let mut ledger = ledger();
        let bad = StateUpdate {
            workers: vec![addr("w")],
            capacities: vec![10],
            total_capacity: 5,
            validators: vec![addr("val")],
            ..Default::default()
        };
        let before = *ledger.emission();
        assert!(matches!(
            ledger.update_contract(&addr("cert"), &bad, Timestamp::new(0)),
            Err(LedgerError::InvalidCapacity(_))
        ));
        assert_eq!(*ledger.emission(), before);
        assert_eq!(ledger.last_update(), None);
        assert!(ledger.take_journal().is_empty());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_halving_is_logged_only_when_applied() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut ledger = ledger();
            for i in 0..4 {
                ledger
                    .update_contract(&addr("cert"), &update(&["val"]), Timestamp::new(i * 3_600))
                    .unwrap();
            }
            let due = Timestamp::new(4 * 3_600);
            let bad = StateUpdate {
                workers: vec![addr("w")],
                capacities: vec![10],
                total_capacity: 5,
                validators: vec![addr("val")],
                ..Default::default()
            };
            assert!(ledger.update_contract(&addr("cert"), &bad, due).is_err());
            assert!(!logs.text().contains("emission rate halved"));
            assert_eq!(ledger.emission().emission_rate(), 100);

            let summary = ledger
                .update_contract(&addr("cert"), &update(&["val"]), due)
                .unwrap();
            assert_eq!(summary.emission, 50);
            assert_eq!(logs.text().matches("emission rate halved").count(), 1);
        });
    }

    #[test]
    fn test_owner_operations() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.halve_state_time(&addr("alice")),
            Err(LedgerError::UnauthorizedCaller(_))
        ));
        ledger.halve_state_time(&addr("owner")).unwrap();
        assert_eq!(ledger.emission().emission_rate(), 50);
        assert_eq!(ledger.emission().halving_period(), 8);
        ledger.double_state_time(&addr("owner")).unwrap();
        assert_eq!(ledger.emission().emission_rate(), 100);
        let journal = ledger.take_journal();
        assert_eq!(
            journal.certifier_calls,
            vec![CertifierCall::HalvePeriod, CertifierCall::DoublePeriod]
        );

        ledger.set_lock_amount(&addr("owner"), 2_000).unwrap();
        assert_eq!(ledger.params().min_stake, 2_000);
        assert_eq!(ledger.params().version, 1);

        assert!(matches!(
            ledger.set_certifier(&addr("owner"), addr("other")),
            Err(LedgerError::CertifierAlreadySet(_))
        ));
    }

    #[test]
    fn test_event_sequence_is_contiguous() {
        let mut ledger = ledger();
        ledger.transfer(&addr("alice"), &addr("bob"), 5).unwrap();
        ledger.transfer(&addr("bob"), &addr("alice"), 5).unwrap();
        let journal = ledger.take_journal();
        let seqs: Vec<u64> = journal.events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(ledger.next_event_seq(), 2);
    }
}
