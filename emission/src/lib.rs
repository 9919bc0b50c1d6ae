//! Emission: the new-token issuance granted per accepted state update.
//!
//! Every accepted state update pays out the current `emission_rate`. After
//! `halving_period` updates the rate halves (floor division), never going
//! below `tail_emission`. Privileged timing changes (`halve_state_time` /
//! `double_state_time`) rescale rate, tail and period together so the
//! emission per unit of wall-clock time is preserved.

pub mod error;
pub mod schedule;

pub use error::EmissionError;
pub use schedule::{EmissionParams, EmissionSchedule, PeriodEmission};
