//! Abstract storage traits for the tasknet ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`LedgerStore`]. The ledger serializes its own records and hands the
//! store opaque bytes, so this crate does not depend on the ledger crate.

pub mod batch;
pub mod error;
pub mod ledger;
pub mod meta;

pub use batch::{WriteBatch, WriteOp};
pub use error::StoreError;
pub use ledger::{LedgerStore, Table};
pub use meta::SCHEMA_VERSION_KEY;
