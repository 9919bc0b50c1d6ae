//! Emission-specific errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmissionError {
    #[error("halving period must be at least one state update")]
    InvalidHalvingPeriod,

    #[error("arithmetic overflow in emission computation")]
    Overflow,
}
