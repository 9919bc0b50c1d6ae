//! Integration tests exercising the ledger host end to end:
//! entry point → core ledger → durable commit → certifier dispatch → events.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use tasknet_ledger::{LedgerError, LedgerEvent, RecordedEvent, StateUpdate, UnlockOutcome};
use tasknet_node::{Allocation, GenesisConfig, LedgerNode, NodeConfig, NodeError};
use tasknet_nullables::{NullCertifier, NullClock, NullStore};
use tasknet_types::{Address, CertifierCall, JobId, PublicKeyHash};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn addr(name: &str) -> Address {
    Address::new(format!("tn_{name}"))
}

fn genesis() -> GenesisConfig {
    let mut genesis = GenesisConfig {
        owner: addr("owner"),
        certifier: Some(addr("cert")),
        ..Default::default()
    };
    genesis.emission.emission_rate = 1_000;
    genesis.emission.tail_emission = 100;
    genesis.emission.halving_period = 10;
    for (name, amount) in [("alice", 50_000), ("val", 20_000)] {
        genesis.allocations.push(Allocation {
            address: addr(name),
            amount,
        });
    }
    genesis
}

struct Harness {
    node: Arc<LedgerNode>,
    store: Arc<NullStore>,
    clock: Arc<NullClock>,
    certifier: Arc<NullCertifier>,
}

fn harness() -> Harness {
    let store = Arc::new(NullStore::new());
    let clock = Arc::new(NullClock::new(1_000_000));
    let certifier = Arc::new(NullCertifier::with_active([addr("val")]));
    let node = LedgerNode::open(store.clone(), certifier.clone(), clock.clone(), &genesis())
        .expect("open node");
    Harness {
        node: Arc::new(node),
        store,
        clock,
        certifier,
    }
}

fn batch(jobs: Vec<JobId>) -> StateUpdate {
    StateUpdate {
        completed_jobs: jobs,
        workers: vec![addr("w1"), addr("w2")],
        capacities: vec![25, 75],
        total_capacity: 100,
        validators: vec![addr("val")],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn job_to_reward_round_trip() {
    let h = harness();
    let job = JobId::digest(b"render frame 1");
    h.node
        .request_job(&addr("alice"), 1, job, vec![16], 4_000)
        .unwrap();
    h.node
        .create_validator(&addr("val"), PublicKeyHash::new([9; 32]), 5_000)
        .unwrap();

    let summary = h.node.update_contract(&addr("cert"), &batch(vec![job])).unwrap();
    assert_eq!(summary.total_reward(), 5_000);
    assert_eq!(h.node.unclaimed_rewards(&addr("val")).unwrap(), 1_000);
    assert_eq!(h.node.unclaimed_rewards(&addr("w1")).unwrap(), 1_000);
    assert_eq!(h.node.unclaimed_rewards(&addr("w2")).unwrap(), 3_000);

    assert_eq!(h.node.claim_rewards(&addr("w2")).unwrap(), 3_000);
    assert_eq!(h.node.balance_of(&addr("w2")).unwrap(), 3_000);
    assert!(h.node.conservation().unwrap().holds());

    let metrics = h.node.metrics();
    assert_eq!(metrics.state_updates.get(), 1);
    assert_eq!(metrics.jobs_completed.get(), 1);
    assert_eq!(
        metrics
            .operations_accepted
            .with_label_values(&["claim_rewards"])
            .get(),
        1
    );
}

#[test]
fn rejected_call_counts_and_leaves_store_untouched() {
    let h = harness();
    let commits = h.store.commit_count();
    let err = h.node.claim_rewards(&addr("alice")).unwrap_err();
    assert!(matches!(err, NodeError::Ledger(LedgerError::NoRewards(_))));
    assert_eq!(h.store.commit_count(), commits);
    assert_eq!(
        h.node
            .metrics()
            .operations_rejected
            .with_label_values(&["claim_rewards"])
            .get(),
        1
    );
}

#[test]
fn state_updates_follow_the_clock() {
    let h = harness();
    let update = StateUpdate {
        validators: vec![addr("val")],
        ..Default::default()
    };
    h.node.update_contract(&addr("cert"), &update).unwrap();
    h.clock.advance(3_599);
    assert!(matches!(
        h.node.update_contract(&addr("cert"), &update),
        Err(NodeError::Ledger(LedgerError::RateLimited { .. }))
    ));
    h.clock.advance(1);
    h.node.update_contract(&addr("cert"), &update).unwrap();
    assert_eq!(h.node.unclaimed_rewards(&addr("val")).unwrap(), 2_000);
}

#[test]
fn withdrawal_below_minimum_removes_validator_from_certifier() {
    let h = harness();
    let val = addr("val");
    h.node
        .create_validator(&val, PublicKeyHash::new([1; 32]), 1_500)
        .unwrap();
    let outcome = h.node.unlock_tokens(&val, 1_000).unwrap();
    assert!(matches!(outcome, UnlockOutcome::Initiated { deactivated: false, .. }));
    assert!(h.certifier.calls().is_empty());

    h.clock.advance(14 * 24 * 3_600);
    h.node.unlock_tokens(&val, 1_000).unwrap();
    assert_eq!(h.certifier.calls(), vec![CertifierCall::RemoveValidator(val.clone())]);
    assert!(!h.node.is_active_validator(&val));
    assert_eq!(h.node.num_validators(), 0);
    assert!(!h.node.is_locked(&val).unwrap());
}

#[test]
fn owner_timing_changes_reach_the_certifier() {
    let h = harness();
    h.node.halve_state_time(&addr("owner")).unwrap();
    h.node.double_state_time(&addr("owner")).unwrap();
    assert!(matches!(
        h.node.halve_state_time(&addr("alice")),
        Err(NodeError::Ledger(LedgerError::UnauthorizedCaller(_)))
    ));
    assert_eq!(
        h.certifier.calls(),
        vec![CertifierCall::HalvePeriod, CertifierCall::DoublePeriod]
    );
}

#[test]
fn certifier_outage_does_not_undo_committed_change() {
    let h = harness();
    h.certifier.set_unavailable(true);
    h.node.halve_state_time(&addr("owner")).unwrap();
    let events = h.node.events_since(0, 10).unwrap();
    assert!(matches!(
        events.last().map(|e| &e.event),
        Some(LedgerEvent::EmissionRateUpdated { new_rate: 500, .. })
    ));
}

#[test]
fn failed_commit_rolls_back_in_memory_state() {
    let h = harness();
    h.store.fail_next_commit();
    let err = h.node.transfer(&addr("alice"), &addr("bob"), 100).unwrap_err();
    assert!(matches!(err, NodeError::Ledger(LedgerError::Store(_))));
    assert_eq!(h.node.balance_of(&addr("alice")).unwrap(), 50_000);
    assert_eq!(h.node.balance_of(&addr("bob")).unwrap(), 0);
    assert!(h.node.events_since(0, 10).unwrap().is_empty());

    h.node.transfer(&addr("alice"), &addr("bob"), 100).unwrap();
    let events = h.node.events_since(0, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].seq, 0);
}

#[test]
fn unrecoverable_commit_failure_halts_the_node() {
    let h = harness();
    h.node.transfer(&addr("alice"), &addr("bob"), 100).unwrap();

    h.store.set_unavailable(true);
    let err = h.node.transfer(&addr("alice"), &addr("bob"), 400).unwrap_err();
    assert!(matches!(err, NodeError::Ledger(LedgerError::Store(_))));
    assert!(h.node.is_halted());

    // Nothing that was never committed may be observed or built upon.
    assert!(matches!(h.node.balance_of(&addr("bob")), Err(NodeError::Halted)));
    h.store.set_unavailable(false);
    assert!(matches!(
        h.node.transfer(&addr("alice"), &addr("bob"), 1),
        Err(NodeError::Halted)
    ));

    // The store still holds the last durable state, and a fresh node sees it.
    let reopened = LedgerNode::open(
        h.store.clone(),
        h.certifier.clone(),
        h.clock.clone(),
        &genesis(),
    )
    .unwrap();
    assert_eq!(reopened.balance_of(&addr("alice")).unwrap(), 49_900);
    assert_eq!(reopened.balance_of(&addr("bob")).unwrap(), 100);
    assert!(reopened.conservation().unwrap().holds());
}

#[test]
fn listeners_receive_events_and_cannot_reenter() {
    let h = harness();
    let weak: Arc<OnceLock<Weak<LedgerNode>>> = Arc::new(OnceLock::new());
    let _ = weak.set(Arc::downgrade(&h.node));
    let seen = Arc::new(Mutex::new(Vec::new()));

    {
        let weak = Arc::clone(&weak);
        let seen = Arc::clone(&seen);
        h.node
            .subscribe(Box::new(move |recorded: &RecordedEvent| {
                let reentry = weak
                    .get()
                    .and_then(Weak::upgrade)
                    .map(|node| node.transfer(&addr("bob"), &addr("alice"), 1));
                seen.lock()
                    .unwrap()
                    .push((recorded.event.name(), matches!(reentry, Some(Err(NodeError::Reentrant)))));
            }))
            .unwrap();
    }

    h.node.transfer(&addr("alice"), &addr("bob"), 10).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![("transferred", true)]);
    assert_eq!(h.node.balance_of(&addr("bob")).unwrap(), 10);

    // The guard is released once the call returns.
    h.node.transfer(&addr("bob"), &addr("alice"), 1).unwrap();
}

#[test]
fn lmdb_ledger_survives_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = NodeConfig {
        data_dir: dir.path().to_path_buf(),
        map_size_mb: 64,
        genesis: genesis(),
        ..Default::default()
    };
    let job = JobId::digest(b"persisted job");
    {
        let node = LedgerNode::open_lmdb(&config).expect("open lmdb node");
        node.request_job(&addr("alice"), 7, job, vec![1, 2, 3], 2_500)
            .unwrap();
        node.transfer(&addr("alice"), &addr("bob"), 500).unwrap();
        node.create_validator(&addr("val"), PublicKeyHash::new([5; 32]), 3_000)
            .unwrap();
    }

    let node = LedgerNode::open_lmdb(&config).expect("reopen lmdb node");
    assert_eq!(node.balance_of(&addr("alice")).unwrap(), 47_000);
    assert_eq!(node.balance_of(&addr("bob")).unwrap(), 500);
    assert_eq!(node.job(&job).unwrap().map(|j| j.capacities), Some(vec![1, 2, 3]));
    assert_eq!(node.validator(&addr("val")).unwrap().map(|v| v.locked), Some(3_000));
    let report = node.conservation().unwrap();
    assert!(report.holds());
    assert_eq!(report.total_supply, 70_000);
    assert_eq!(node.events_since(0, 100).unwrap().len(), 4);
}
