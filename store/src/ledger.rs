//! Ledger storage trait.

use crate::{StoreError, WriteBatch};
use serde::{Deserialize, Serialize};

/// The logical tables that make up durable ledger state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    /// Address → spendable balance.
    Balances,
    /// Job id → escrowed job record.
    Jobs,
    /// Address → validator record.
    Validators,
    /// Address → unclaimed reward.
    Rewards,
    /// Event sequence number → notification.
    Events,
    /// Singleton records: ledger meta, schema version.
    Meta,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Balances,
        Table::Jobs,
        Table::Validators,
        Table::Rewards,
        Table::Events,
        Table::Meta,
    ];

    /// Stable name, used as the backend database name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Balances => "balances",
            Table::Jobs => "jobs",
            Table::Validators => "validators",
            Table::Rewards => "rewards",
            Table::Events => "events",
            Table::Meta => "meta",
        }
    }
}

/// Durable key-value storage for the ledger.
///
/// Writes only happen through [`LedgerStore::commit`], which must apply the
/// whole batch atomically: after a crash either every op of the batch is
/// visible or none is.
pub trait LedgerStore: Send + Sync {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// All entries of a table in key order.
    fn iter(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Entries of a table whose key is `>= from`, in key order, at most `limit`.
    fn iter_from(
        &self,
        table: Table,
        from: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .iter(table)?
            .into_iter()
            .filter(|(k, _)| k.as_slice() >= from)
            .take(limit)
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        self.iter(table).map(|v| v.len() as u64)
    }
}
