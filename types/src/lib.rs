//! Fundamental types for the tasknet ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, job and identity hashes, timestamps, protocol parameters, and the
//! interface of the external certifier that drives state updates.

pub mod address;
pub mod certifier;
pub mod error;
pub mod hash;
pub mod params;
pub mod time;

pub use address::Address;
pub use certifier::{CertifierCall, CertifierError, CertifierRegistry};
pub use error::TypesError;
pub use hash::{JobId, PublicKeyHash};
pub use params::ProtocolParams;
pub use time::{Clock, SystemClock, Timestamp};
