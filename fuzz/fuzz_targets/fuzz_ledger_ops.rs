#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use tasknet_emission::EmissionParams;
use tasknet_ledger::{Ledger, StateUpdate};
use tasknet_nullables::NullStore;
use tasknet_store::LedgerStore;
use tasknet_types::{Address, JobId, ProtocolParams, PublicKeyHash, Timestamp};

#[derive(Arbitrary, Debug)]
enum Op {
    Transfer { from: u8, to: u8, amount: u32 },
    RequestJob { caller: u8, job: u8, payment: u32 },
    CancelJob { caller: u8, job: u8 },
    CompleteJob { job: u8 },
    CreateValidator { caller: u8, key: u8, amount: u32 },
    Lock { caller: u8, amount: u32 },
    Unlock { caller: u8, amount: u32 },
    Claim { caller: u8 },
    Update { jobs: Vec<u8>, workers: Vec<(u8, u16)>, spare: u16, validators: Vec<u8> },
    Halve,
    Double,
    Wait { secs: u32 },
}

fn account(i: u8) -> Address {
    Address::new(format!("tn_acct{}", i % 8))
}

// Apply arbitrary operation sequences; supply must stay conserved and a
// reload from the store must reproduce the in-memory ledger.
fuzz_target!(|ops: Vec<Op>| {
    let store = NullStore::new();
    let owner = Address::new("tn_owner");
    let cert = Address::new("tn_cert");
    let allocations: Vec<_> = (0..8).map(|i| (account(i), 1_000_000u128)).collect();
    let Ok(mut ledger) = Ledger::genesis(
        owner.clone(),
        ProtocolParams::dev_defaults(),
        EmissionParams { emission_rate: 10_000, tail_emission: 100, halving_period: 4 },
        Some(cert.clone()),
        &allocations,
    ) else {
        return;
    };
    let mut now = 0u64;

    for op in ops.into_iter().take(256) {
        let at = Timestamp::new(now);
        let _ = match op {
            Op::Transfer { from, to, amount } => {
                ledger.transfer(&account(from), &account(to), amount.into()).map(drop)
            }
            Op::RequestJob { caller, job, payment } => ledger
                .request_job(&account(caller), 0, JobId::digest(&[job]), vec![1], payment.into(), at)
                .map(drop),
            Op::CancelJob { caller, job } => {
                ledger.cancel_job(&account(caller), &JobId::digest(&[job])).map(drop)
            }
            Op::CompleteJob { job } => ledger.complete_job(&cert, &JobId::digest(&[job])).map(drop),
            Op::CreateValidator { caller, key, amount } => ledger
                .create_validator(&account(caller), PublicKeyHash::new([key | 1; 32]), amount.into(), at)
                .map(drop),
            Op::Lock { caller, amount } => ledger.lock_tokens(&account(caller), amount.into()).map(drop),
            Op::Unlock { caller, amount } => {
                ledger.unlock_tokens(&account(caller), amount.into(), at).map(drop)
            }
            Op::Claim { caller } => ledger.claim_rewards(&account(caller)).map(drop),
            Op::Update { jobs, workers, spare, validators } => {
                let capacities: Vec<u64> = workers.iter().map(|(_, c)| u64::from(*c)).collect();
                let update = StateUpdate {
                    completed_jobs: jobs.iter().map(|j| JobId::digest(&[*j])).collect(),
                    workers: workers.iter().map(|(w, _)| account(*w)).collect(),
                    total_capacity: capacities.iter().sum::<u64>() + u64::from(spare),
                    capacities,
                    validators: validators.iter().map(|v| account(*v)).collect(),
                };
                ledger.update_contract(&cert, &update, at).map(drop)
            }
            Op::Halve => ledger.halve_state_time(&owner),
            Op::Double => ledger.double_state_time(&owner),
            Op::Wait { secs } => {
                now += u64::from(secs);
                Ok(())
            }
        }
        .map_err(|_| ledger.discard_journal());

        let journal = ledger.take_journal();
        if !journal.is_empty() {
            let batch = ledger.write_batch(&journal).expect("encodable ledger");
            store.commit(batch).expect("null store commit");
        }
        assert!(ledger.conservation().holds());
    }

    if let Ok(Some(restored)) = Ledger::load(&store) {
        assert_eq!(restored.conservation(), ledger.conservation());
        assert_eq!(restored.next_event_seq(), ledger.next_event_seq());
    }
});
