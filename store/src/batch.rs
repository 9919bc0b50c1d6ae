//! Write batching: groups every write produced by one ledger operation so
//! the backend can apply them in a single transaction.

use crate::Table;

/// A single write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        table: Table,
        key: Vec<u8>,
    },
}

/// An ordered list of writes applied atomically by [`crate::LedgerStore::commit`].
///
/// Later ops on the same key win.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, table: Table, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Put {
            table,
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, table: Table, key: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Delete {
            table,
            key: key.into(),
        });
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_preserves_op_order() {
        let mut batch = WriteBatch::new();
        batch.put(Table::Balances, b"tn_a".to_vec(), 5u128.to_be_bytes().to_vec());
        batch.delete(Table::Balances, b"tn_a".to_vec());
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch.ops()[0], WriteOp::Put { .. }));
        assert!(matches!(batch.ops()[1], WriteOp::Delete { .. }));
    }

    #[test]
    fn empty_batch() {
        let batch = WriteBatch::default();
        assert!(batch.is_empty());
        assert!(batch.into_ops().is_empty());
    }
}
