//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the ledger host (clock, durable store,
//! certifier component) sits behind a trait. This crate provides
//! implementations that:
//! - return deterministic values
//! - can be controlled programmatically
//! - never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod certifier;
pub mod clock;
pub mod store;

pub use certifier::NullCertifier;
pub use clock::NullClock;
pub use store::NullStore;
