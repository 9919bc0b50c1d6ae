//! The ledger host: owns the single [`Ledger`] instance and serializes every
//! mutation through it.
//!
//! A mutating call holds the write lock for validate, apply and durable
//! commit, so readers only ever see settled state. After the commit the
//! queued certifier calls are dispatched and the events fanned out, still
//! inside the mutation guard.

use std::cell::Cell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use tasknet_ledger::{
    read_events, ConservationReport, Job, Ledger, LedgerError, RecordedEvent, StateUpdate,
    StateUpdateSummary, UnlockOutcome, Validator,
};
use tasknet_store::LedgerStore;
use tasknet_store_lmdb::LmdbEnvironment;
use tasknet_types::{Address, CertifierRegistry, Clock, JobId, PublicKeyHash, SystemClock, Timestamp};

use crate::certifier::OutboxCertifier;
use crate::config::{GenesisConfig, NodeConfig};
use crate::error::NodeError;
use crate::ledger_event::EventBus;
use crate::metrics::LedgerMetrics;

thread_local! {
    static IN_MUTATION: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside a mutating call.
struct MutationGuard;

impl MutationGuard {
    fn enter() -> Result<Self, NodeError> {
        IN_MUTATION.with(|flag| {
            if flag.get() {
                Err(NodeError::Reentrant)
            } else {
                flag.set(true);
                Ok(MutationGuard)
            }
        })
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        IN_MUTATION.with(|flag| flag.set(false));
    }
}

pub struct LedgerNode {
    ledger: RwLock<Ledger>,
    store: Arc<dyn LedgerStore>,
    certifier: Arc<dyn CertifierRegistry>,
    clock: Arc<dyn Clock>,
    events: RwLock<EventBus>,
    metrics: LedgerMetrics,
    /// Set when a failed commit could not be rolled back by reloading. The
    /// in-memory ledger then holds changes the store never saw.
    halted: AtomicBool,
}

impl LedgerNode {
    /// Load the ledger from `store`, creating it from `genesis` when the
    /// store is empty.
    pub fn open(
        store: Arc<dyn LedgerStore>,
        certifier: Arc<dyn CertifierRegistry>,
        clock: Arc<dyn Clock>,
        genesis: &GenesisConfig,
    ) -> Result<Self, NodeError> {
        let ledger = match Ledger::load(store.as_ref())? {
            Some(ledger) => ledger,
            None => {
                let mut ledger = Ledger::genesis(
                    genesis.owner.clone(),
                    genesis.protocol_params(),
                    genesis.emission_params(),
                    genesis.certifier.clone(),
                    &genesis.allocations(),
                )?;
                let journal = ledger.take_journal();
                store.commit(ledger.write_batch(&journal)?)?;
                ledger
            }
        };
        let metrics = LedgerMetrics::new()?;
        metrics.observe(&ledger);
        Ok(Self {
            ledger: RwLock::new(ledger),
            store,
            certifier,
            clock,
            events: RwLock::new(EventBus::new()),
            metrics,
            halted: AtomicBool::new(false),
        })
    }

    /// Open an LMDB-backed node as described by `config`.
    pub fn open_lmdb(config: &NodeConfig) -> Result<Self, NodeError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let env = LmdbEnvironment::open(Path::new(&config.data_dir), config.map_size_bytes())?;
        let certifier = OutboxCertifier::new(
            config.outbox_path(),
            config.certifier.active_validators.iter().cloned(),
        );
        tracing::info!(
            data_dir = %config.data_dir.display(),
            outbox = %certifier.path().display(),
            "opening ledger"
        );
        Self::open(
            Arc::new(env),
            Arc::new(certifier),
            Arc::new(SystemClock),
            &config.genesis,
        )
    }

    pub fn subscribe(&self, listener: Box<dyn Fn(&RecordedEvent) + Send + Sync>) -> Result<(), NodeError> {
        self.events
            .write()
            .map_err(|_| NodeError::Poisoned)?
            .subscribe(listener);
        Ok(())
    }

    pub fn metrics(&self) -> &LedgerMetrics {
        &self.metrics
    }

    /// Run one mutating operation: apply, commit, dispatch, publish.
    ///
    /// A rejected operation has no effect. If the commit fails the in-memory
    /// ledger is reloaded from the store so it matches what is durable. If
    /// that reload fails too the node halts and refuses every later call.
    fn mutate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Ledger, Timestamp) -> Result<T, LedgerError>,
    ) -> Result<T, NodeError> {
        let _guard = MutationGuard::enter()?;
        let now = self.clock.now();

        let (value, journal) = {
            let mut ledger = self.ledger.write().map_err(|_| NodeError::Poisoned)?;
            self.ensure_running()?;
            let value = match f(&mut *ledger, now) {
                Ok(value) => value,
                Err(e) => {
                    ledger.discard_journal();
                    self.metrics.rejected(operation);
                    tracing::debug!(operation, error = %e, "operation rejected");
                    return Err(e.into());
                }
            };
            let journal = ledger.take_journal();
            if !journal.is_empty() {
                let committed = ledger
                    .write_batch(&journal)
                    .and_then(|batch| self.store.commit(batch).map_err(LedgerError::from));
                if let Err(e) = committed {
                    tracing::warn!(operation, error = %e, "commit failed, reloading ledger from store");
                    match Ledger::load(self.store.as_ref()) {
                        Ok(Some(restored)) => *ledger = restored,
                        Ok(None) => {
                            tracing::error!("store holds no ledger after failed commit, halting");
                            self.halted.store(true, Ordering::SeqCst);
                        }
                        Err(reload) => {
                            tracing::error!(error = %reload, "ledger reload failed, halting");
                            self.halted.store(true, Ordering::SeqCst);
                        }
                    }
                    self.metrics.rejected(operation);
                    return Err(e.into());
                }
            }
            self.metrics.observe(&ledger);
            (value, journal)
        };
        self.metrics.accepted(operation);

        for call in &journal.certifier_calls {
            if let Err(e) = self.certifier.dispatch(call) {
                tracing::warn!(?call, error = %e, "certifier call failed");
            }
        }
        let bus = self.events.read().map_err(|_| NodeError::Poisoned)?;
        for event in &journal.events {
            bus.emit(event);
        }
        Ok(value)
    }

    fn ensure_running(&self) -> Result<(), NodeError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(NodeError::Halted);
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Ledger>, NodeError> {
        let ledger = self.ledger.read().map_err(|_| NodeError::Poisoned)?;
        self.ensure_running()?;
        Ok(ledger)
    }

    /// Whether the node stopped serving after an unrecoverable commit failure.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    // ── Mutating entry points ────────────────────────────────────────────

    pub fn transfer(&self, caller: &Address, to: &Address, amount: u128) -> Result<(), NodeError> {
        self.mutate("transfer", |l, _| l.transfer(caller, to, amount))
    }

    pub fn request_job(
        &self,
        caller: &Address,
        user_ref: u64,
        job_id: JobId,
        capacities: Vec<u64>,
        payment: u128,
    ) -> Result<(), NodeError> {
        self.mutate("request_job", |l, now| {
            l.request_job(caller, user_ref, job_id, capacities, payment, now)
        })
    }

    pub fn cancel_job(&self, caller: &Address, job_id: &JobId) -> Result<u128, NodeError> {
        self.mutate("cancel_job", |l, _| l.cancel_job(caller, job_id))
    }

    pub fn complete_job(&self, caller: &Address, job_id: &JobId) -> Result<u128, NodeError> {
        let released = self.mutate("complete_job", |l, _| l.complete_job(caller, job_id))?;
        if released > 0 {
            self.metrics.jobs_completed.inc();
        }
        Ok(released)
    }

    pub fn create_validator(
        &self,
        caller: &Address,
        public_key_hash: PublicKeyHash,
        initial_lock: u128,
    ) -> Result<(), NodeError> {
        self.mutate("create_validator", |l, now| {
            l.create_validator(caller, public_key_hash, initial_lock, now)
        })
    }

    pub fn lock_tokens(&self, caller: &Address, amount: u128) -> Result<(), NodeError> {
        self.mutate("lock_tokens", |l, _| l.lock_tokens(caller, amount))
    }

    pub fn unlock_tokens(&self, caller: &Address, amount: u128) -> Result<UnlockOutcome, NodeError> {
        self.mutate("unlock_tokens", |l, now| l.unlock_tokens(caller, amount, now))
    }

    pub fn claim_rewards(&self, caller: &Address) -> Result<u128, NodeError> {
        self.mutate("claim_rewards", |l, _| l.claim_rewards(caller))
    }

    pub fn update_contract(
        &self,
        caller: &Address,
        update: &StateUpdate,
    ) -> Result<StateUpdateSummary, NodeError> {
        let timer = self.metrics.state_update_duration.start_timer();
        let summary = self.mutate("update_contract", |l, now| l.update_contract(caller, update, now));
        timer.observe_duration();
        let summary = summary?;
        self.metrics.state_updates.inc();
        self.metrics.jobs_completed.inc_by(summary.completed_jobs);
        Ok(summary)
    }

    pub fn set_certifier(&self, caller: &Address, certifier: Address) -> Result<(), NodeError> {
        self.mutate("set_certifier", |l, _| l.set_certifier(caller, certifier))
    }

    pub fn halve_state_time(&self, caller: &Address) -> Result<(), NodeError> {
        self.mutate("halve_state_time", |l, _| l.halve_state_time(caller))
    }

    pub fn double_state_time(&self, caller: &Address) -> Result<(), NodeError> {
        self.mutate("double_state_time", |l, _| l.double_state_time(caller))
    }

    pub fn set_lock_amount(&self, caller: &Address, amount: u128) -> Result<(), NodeError> {
        self.mutate("set_lock_amount", |l, _| l.set_lock_amount(caller, amount))
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Run `f` against a settled view of the ledger.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&Ledger) -> T) -> Result<T, NodeError> {
        Ok(f(&*self.read()?))
    }

    pub fn balance_of(&self, address: &Address) -> Result<u128, NodeError> {
        self.with_ledger(|l| l.balance_of(address))
    }

    pub fn unclaimed_rewards(&self, address: &Address) -> Result<u128, NodeError> {
        self.with_ledger(|l| l.unclaimed_rewards(address))
    }

    pub fn is_locked(&self, address: &Address) -> Result<bool, NodeError> {
        self.with_ledger(|l| l.is_locked(address))
    }

    pub fn validator(&self, address: &Address) -> Result<Option<Validator>, NodeError> {
        self.with_ledger(|l| l.validator(address).cloned())
    }

    pub fn job(&self, job_id: &JobId) -> Result<Option<Job>, NodeError> {
        self.with_ledger(|l| l.job(job_id).cloned())
    }

    pub fn conservation(&self) -> Result<ConservationReport, NodeError> {
        self.with_ledger(|l| l.conservation())
    }

    /// Size of the certifier's active validator set.
    pub fn num_validators(&self) -> u64 {
        self.certifier.num_validators()
    }

    pub fn is_active_validator(&self, address: &Address) -> bool {
        self.certifier.is_active_validator(address)
    }

    /// Durable events from sequence `from` on, at most `limit`.
    pub fn events_since(&self, from: u64, limit: usize) -> Result<Vec<RecordedEvent>, NodeError> {
        Ok(read_events(self.store.as_ref(), from, limit)?)
    }
}
