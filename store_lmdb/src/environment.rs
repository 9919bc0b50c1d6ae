//! LMDB environment setup and the [`LedgerStore`] implementation.

use std::ops::Bound;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use tasknet_store::{LedgerStore, StoreError, Table, WriteBatch, WriteOp};

use crate::LmdbError;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

/// Wraps the LMDB environment and one database handle per [`Table`].
pub struct LmdbEnvironment {
    env: Env,
    balances_db: Database<Bytes, Bytes>,
    jobs_db: Database<Bytes, Bytes>,
    validators_db: Database<Bytes, Bytes>,
    rewards_db: Database<Bytes, Bytes>,
    events_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment directory is owned by this process; the
        // ledger host never opens the same path twice.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let balances_db = env.create_database(&mut wtxn, Some(Table::Balances.name()))?;
        let jobs_db = env.create_database(&mut wtxn, Some(Table::Jobs.name()))?;
        let validators_db = env.create_database(&mut wtxn, Some(Table::Validators.name()))?;
        let rewards_db = env.create_database(&mut wtxn, Some(Table::Rewards.name()))?;
        let events_db = env.create_database(&mut wtxn, Some(Table::Events.name()))?;
        let meta_db = env.create_database(&mut wtxn, Some(Table::Meta.name()))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            balances_db,
            jobs_db,
            validators_db,
            rewards_db,
            events_db,
            meta_db,
        })
    }

    fn db(&self, table: Table) -> Database<Bytes, Bytes> {
        match table {
            Table::Balances => self.balances_db,
            Table::Jobs => self.jobs_db,
            Table::Validators => self.validators_db,
            Table::Rewards => self.rewards_db,
            Table::Events => self.events_db,
            Table::Meta => self.meta_db,
        }
    }
}

impl LedgerStore for LmdbEnvironment {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .db(table)
            .get(&rtxn, key)
            .map_err(LmdbError::from)?
            .map(|v| v.to_vec());
        Ok(val)
    }

    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in self.db(table).iter(&rtxn).map_err(LmdbError::from)? {
            let (key, val) = item.map_err(LmdbError::from)?;
            results.push((key.to_vec(), val.to_vec()));
        }
        Ok(results)
    }

    fn iter_from(
        &self,
        table: Table,
        from: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let range: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(from), Bound::Unbounded);
        let mut results = Vec::new();
        for item in self.db(table).range(&rtxn, &range).map_err(LmdbError::from)? {
            if results.len() >= limit {
                break;
            }
            let (key, val) = item.map_err(LmdbError::from)?;
            results.push((key.to_vec(), val.to_vec()));
        }
        Ok(results)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let count = batch.len();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => {
                    self.db(table)
                        .put(&mut wtxn, key.as_slice(), value.as_slice())
                        .map_err(LmdbError::from)?;
                }
                WriteOp::Delete { table, key } => {
                    self.db(table)
                        .delete(&mut wtxn, key.as_slice())
                        .map_err(LmdbError::from)?;
                }
            }
        }
        // Dropping `wtxn` on an error above aborts the whole batch.
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::trace!(ops = count, "committed write batch");
        Ok(())
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.db(table).len(&rtxn).map_err(LmdbError::from)?)
    }
}
