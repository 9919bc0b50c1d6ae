//! LMDB storage backend for the tasknet ledger.
//!
//! Implements [`tasknet_store::LedgerStore`] using the `heed` LMDB bindings.
//! Each logical table maps to one named LMDB database within a single
//! environment, so a write batch spanning several tables commits in one
//! LMDB write transaction.

pub mod environment;
pub mod error;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
