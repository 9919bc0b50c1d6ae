//! Nullable store: thread-safe in-memory [`LedgerStore`] for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tasknet_store::{LedgerStore, StoreError, Table, WriteBatch, WriteOp};

type TableMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory store with LMDB's ordering and all-or-nothing commits.
///
/// [`fail_next_commit`](Self::fail_next_commit) makes the next commit fail
/// without applying anything, to exercise the host's recovery path.
/// [`set_unavailable`](Self::set_unavailable) fails every read and write.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<HashMap<Table, TableMap>>,
    fail_next: AtomicBool,
    unavailable: AtomicBool,
    commits: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store offline".to_string()));
        }
        Ok(())
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

impl LedgerStore for NullStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(&table)
            .and_then(|t| t.get(key).cloned()))
    }

    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(&table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.ensure_available()?;
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        let mut tables = self.tables.lock().unwrap();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => {
                    tables.entry(table).or_default().insert(key, value);
                }
                WriteOp::Delete { table, key } => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.remove(&key);
                    }
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
