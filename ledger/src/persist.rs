//! Mapping between the in-memory ledger and [`LedgerStore`] tables.
//!
//! Layout:
//! - `Balances` / `Rewards`: address → u128 (16 bytes, big-endian); absent
//!   means zero
//! - `Jobs`: job id (32 bytes) → bincode [`Job`]
//! - `Validators`: address → bincode [`Validator`]
//! - `Events`: sequence (u64 big-endian) → bincode [`LedgerEvent`]
//! - `Meta`: `ledger` → bincode [`LedgerMeta`], plus the schema version

use crate::balances::BalanceSheet;
use crate::engine::Ledger;
use crate::error::LedgerError;
use crate::escrow::{Job, JobEscrow};
use crate::event::{LedgerEvent, RecordedEvent};
use crate::gate::StateUpdateGate;
use crate::journal::Journal;
use crate::rewards::RewardBook;
use crate::stake::{StakeRegistry, Validator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tasknet_emission::EmissionSchedule;
use tasknet_store::meta::{get_schema_version, put_schema_version};
use tasknet_store::{LedgerStore, StoreError, Table, WriteBatch};
use tasknet_types::{Address, JobId, ProtocolParams};

pub const SCHEMA_VERSION: u32 = 1;

const LEDGER_META_KEY: &[u8] = b"ledger";

/// Scalar ledger state. Totals that can be recomputed from the record
/// tables are not stored.
#[derive(Serialize, Deserialize)]
struct LedgerMeta {
    owner: Address,
    params: ProtocolParams,
    emission: EmissionSchedule,
    gate: StateUpdateGate,
    total_supply: u128,
    total_locked: u128,
    total_forfeited: u128,
    reward_pool: u128,
    job_count: u64,
    validator_count: u64,
    event_seq: u64,
}

fn corruption(msg: impl Into<String>) -> LedgerError {
    LedgerError::Store(StoreError::Corruption(msg.into()))
}

fn decode_address(key: &[u8]) -> Result<Address, LedgerError> {
    let raw = std::str::from_utf8(key).map_err(|_| corruption("address key is not utf-8"))?;
    Address::parse(raw).map_err(|e| corruption(e.to_string()))
}

fn decode_amount(value: &[u8]) -> Result<u128, LedgerError> {
    let bytes: [u8; 16] = value
        .try_into()
        .map_err(|_| corruption("amount has unexpected byte length"))?;
    Ok(u128::from_be_bytes(bytes))
}

fn put_amount(batch: &mut WriteBatch, table: Table, address: &Address, amount: u128) {
    let key = address.as_str().as_bytes().to_vec();
    if amount == 0 {
        batch.delete(table, key);
    } else {
        batch.put(table, key, amount.to_be_bytes().to_vec());
    }
}

fn sum(mut values: impl Iterator<Item = u128>) -> Result<u128, LedgerError> {
    values
        .try_fold(0u128, |acc, v| acc.checked_add(v))
        .ok_or_else(|| corruption("stored totals overflow"))
}

impl Ledger {
    /// Build the store write for the changes recorded in `journal`.
    pub fn write_batch(&self, journal: &Journal) -> Result<WriteBatch, LedgerError> {
        let mut batch = WriteBatch::new();
        for address in &journal.balances {
            put_amount(&mut batch, Table::Balances, address, self.balances.balance_of(address));
        }
        for address in &journal.rewards {
            put_amount(&mut batch, Table::Rewards, address, self.rewards.unclaimed(address));
        }
        for job_id in &journal.jobs {
            let key = job_id.as_bytes().to_vec();
            match self.escrow.get(job_id) {
                Some(job) => batch.put(Table::Jobs, key, bincode::serialize(job)?),
                None => batch.delete(Table::Jobs, key),
            }
        }
        for address in &journal.validators {
            let key = address.as_str().as_bytes().to_vec();
            match self.stakes.get(address) {
                Some(validator) => batch.put(Table::Validators, key, bincode::serialize(validator)?),
                None => batch.delete(Table::Validators, key),
            }
        }
        for recorded in &journal.events {
            batch.put(
                Table::Events,
                recorded.seq.to_be_bytes().to_vec(),
                bincode::serialize(&recorded.event)?,
            );
        }
        let meta = LedgerMeta {
            owner: self.owner.clone(),
            params: self.params.clone(),
            emission: self.emission,
            gate: self.gate.clone(),
            total_supply: self.balances.total_supply(),
            total_locked: self.stakes.total_locked(),
            total_forfeited: self.rewards.total_forfeited(),
            reward_pool: self.reward_pool,
            job_count: self.escrow.job_count(),
            validator_count: self.stakes.validator_count(),
            event_seq: self.event_seq,
        };
        batch.put(Table::Meta, LEDGER_META_KEY, bincode::serialize(&meta)?);
        put_schema_version(&mut batch, SCHEMA_VERSION);
        Ok(batch)
    }

    /// Restore a ledger from `store`. An empty store yields `None`.
    pub fn load(store: &dyn LedgerStore) -> Result<Option<Ledger>, LedgerError> {
        let Some(raw_meta) = store.get(Table::Meta, LEDGER_META_KEY)? else {
            return Ok(None);
        };
        let version = get_schema_version(store)?;
        if version != SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                found: version,
                expected: SCHEMA_VERSION,
            }
            .into());
        }
        let meta: LedgerMeta = bincode::deserialize(&raw_meta)?;

        let mut balances = HashMap::new();
        for (key, value) in store.iter(Table::Balances)? {
            balances.insert(decode_address(&key)?, decode_amount(&value)?);
        }

        let mut jobs = HashMap::new();
        for (key, value) in store.iter(Table::Jobs)? {
            let bytes: [u8; 32] = key
                .as_slice()
                .try_into()
                .map_err(|_| corruption("job id has unexpected byte length"))?;
            let job: Job = bincode::deserialize(&value)?;
            jobs.insert(JobId::new(bytes), job);
        }

        let mut validators = HashMap::new();
        for (key, value) in store.iter(Table::Validators)? {
            let validator: Validator = bincode::deserialize(&value)?;
            validators.insert(decode_address(&key)?, validator);
        }

        let mut unclaimed = HashMap::new();
        for (key, value) in store.iter(Table::Rewards)? {
            unclaimed.insert(decode_address(&key)?, decode_amount(&value)?);
        }

        let total_escrowed = sum(jobs.values().map(|j: &Job| j.payment))?;
        let total_custody = sum(validators.values().map(|v: &Validator| v.locked))?;
        let total_unclaimed = sum(unclaimed.values().copied())?;

        let ledger = Ledger {
            owner: meta.owner,
            params: meta.params,
            balances: BalanceSheet::from_parts(balances, meta.total_supply),
            escrow: JobEscrow::from_parts(jobs, total_escrowed, meta.job_count),
            stakes: StakeRegistry::from_parts(
                validators,
                meta.total_locked,
                total_custody,
                meta.validator_count,
            ),
            rewards: RewardBook::from_parts(unclaimed, total_unclaimed, meta.total_forfeited),
            emission: meta.emission,
            gate: meta.gate,
            reward_pool: meta.reward_pool,
            event_seq: meta.event_seq,
            journal: Journal::default(),
        };
        let report = ledger.conservation();
        if !report.holds() {
            return Err(corruption(format!(
                "supply {} does not match balances {} + escrow {} + custody {}",
                report.total_supply, report.balances, report.escrowed, report.custody
            )));
        }
        tracing::info!(
            total_supply = report.total_supply,
            open_jobs = ledger.open_jobs(),
            validators = ledger.validator_count(),
            event_seq = ledger.event_seq,
            "ledger loaded"
        );
        Ok(Some(ledger))
    }
}

/// Read up to `limit` events starting at sequence `from`.
pub fn read_events(
    store: &dyn LedgerStore,
    from: u64,
    limit: usize,
) -> Result<Vec<RecordedEvent>, LedgerError> {
    store
        .iter_from(Table::Events, &from.to_be_bytes(), limit)?
        .into_iter()
        .map(|(key, value)| {
            let bytes: [u8; 8] = key
                .as_slice()
                .try_into()
                .map_err(|_| corruption("event key has unexpected byte length"))?;
            let event: LedgerEvent = bincode::deserialize(&value)?;
            Ok(RecordedEvent {
                seq: u64::from_be_bytes(bytes),
                event,
            })
        })
        .collect()
}
