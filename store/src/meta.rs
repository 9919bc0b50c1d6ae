//! Metadata keys and schema versioning over the [`Table::Meta`] table.

use crate::{LedgerStore, StoreError, Table, WriteBatch};

/// Key of the schema version record in [`Table::Meta`].
pub const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Read the schema version; an empty store reads as version 0.
pub fn get_schema_version(store: &dyn LedgerStore) -> Result<u32, StoreError> {
    match store.get(Table::Meta, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                StoreError::Corruption("schema_version has unexpected byte length".to_string())
            })?;
            Ok(u32::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

/// Add a schema version write to `batch`.
pub fn put_schema_version(batch: &mut WriteBatch, version: u32) {
    batch.put(Table::Meta, SCHEMA_VERSION_KEY, version.to_le_bytes().to_vec());
}
