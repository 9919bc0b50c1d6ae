//! The tasknet ledger: accounting and incentive engine for the compute network.
//!
//! The [`Ledger`] owns every piece of durable state:
//! - spendable balances and total supply ([`BalanceSheet`])
//! - payments escrowed for requested jobs ([`JobEscrow`])
//! - validator stake held in custody, with two-phase unlock ([`StakeRegistry`])
//! - accrued, unclaimed rewards ([`RewardBook`])
//! - the emission schedule and the state-update gate
//!
//! Every mutating operation validates completely before it writes anything,
//! so a rejected operation has no effect. Accepted operations record the keys
//! they touched, the notifications they emitted and the calls owed to the
//! external certifier in a [`Journal`], which the host turns into one atomic
//! store write.

pub mod balances;
pub mod engine;
pub mod error;
pub mod escrow;
pub mod event;
pub mod gate;
pub mod journal;
pub mod persist;
pub mod rewards;
pub mod stake;

pub use balances::BalanceSheet;
pub use engine::{ConservationReport, Ledger};
pub use error::LedgerError;
pub use escrow::{Job, JobEscrow};
pub use event::{LedgerEvent, RecordedEvent, StateUpdateSummary};
pub use gate::{CertifierSlot, StateUpdate, StateUpdateGate};
pub use journal::Journal;
pub use persist::{read_events, SCHEMA_VERSION};
pub use rewards::{RewardBook, RewardSplit};
pub use stake::{StakeRegistry, UnlockOutcome, UnlockState, Validator};
