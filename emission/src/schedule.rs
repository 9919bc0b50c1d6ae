//! The emission schedule and its versioned parameter record.

use crate::error::EmissionError;
use serde::{Deserialize, Serialize};

/// Emission parameters, as configured at genesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionParams {
    /// Tokens emitted per accepted state update.
    pub emission_rate: u128,
    /// Halving never takes the rate below this floor.
    pub tail_emission: u128,
    /// Number of accepted state updates between halvings.
    pub halving_period: u64,
}

impl Default for EmissionParams {
    fn default() -> Self {
        Self {
            emission_rate: 1_000_000,
            tail_emission: 10_000,
            halving_period: 8_760, // one year of hourly updates
        }
    }
}

/// What a state update pays out, and whether it triggered a halving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodEmission {
    pub amount: u128,
    /// `(old_rate, new_rate)` when this period halved the rate.
    pub halved: Option<(u128, u128)>,
}

/// Process-wide emission state.
///
/// Cheap to copy: the ledger works on a copy during a state update and only
/// writes it back once the whole update has been validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSchedule {
    params: EmissionParams,
    updates_since_halving: u64,
    /// Incremented on every change to `params`.
    version: u64,
}

impl EmissionSchedule {
    pub fn new(params: EmissionParams) -> Result<Self, EmissionError> {
        if params.halving_period == 0 {
            return Err(EmissionError::InvalidHalvingPeriod);
        }
        Ok(Self {
            params,
            updates_since_halving: 0,
            version: 0,
        })
    }

    /// Start a state-update period: apply a halving if one is due, then
    /// return the emission for this period.
    pub fn begin_period(&mut self) -> PeriodEmission {
        let mut halved = None;
        if self.updates_since_halving >= self.params.halving_period
            && self.params.emission_rate > self.params.tail_emission
        {
            let old = self.params.emission_rate;
            let new = (old / 2).max(self.params.tail_emission);
            self.params.emission_rate = new;
            self.updates_since_halving = 0;
            self.version += 1;
            halved = Some((old, new));
        }
        PeriodEmission {
            amount: self.params.emission_rate,
            halved,
        }
    }

    /// Finish a state-update period.
    pub fn advance(&mut self) {
        self.updates_since_halving = self.updates_since_halving.saturating_add(1);
    }

    /// Halve the state-update time: emission per update and tail halve, the
    /// halving period (counted in updates) doubles.
    pub fn halve_state_time(&mut self) -> Result<(), EmissionError> {
        let halving_period = self
            .params
            .halving_period
            .checked_mul(2)
            .ok_or(EmissionError::Overflow)?;
        self.params = EmissionParams {
            emission_rate: self.params.emission_rate / 2,
            tail_emission: self.params.tail_emission / 2,
            halving_period,
        };
        self.version += 1;
        Ok(())
    }

    /// Double the state-update time: emission per update and tail double,
    /// the halving period halves.
    pub fn double_state_time(&mut self) -> Result<(), EmissionError> {
        let halving_period = self.params.halving_period / 2;
        if halving_period == 0 {
            return Err(EmissionError::InvalidHalvingPeriod);
        }
        let emission_rate = self
            .params
            .emission_rate
            .checked_mul(2)
            .ok_or(EmissionError::Overflow)?;
        let tail_emission = self
            .params
            .tail_emission
            .checked_mul(2)
            .ok_or(EmissionError::Overflow)?;
        self.params = EmissionParams {
            emission_rate,
            tail_emission,
            halving_period,
        };
        self.version += 1;
        Ok(())
    }

    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    pub fn emission_rate(&self) -> u128 {
        self.params.emission_rate
    }

    pub fn tail_emission(&self) -> u128 {
        self.params.tail_emission
    }

    pub fn halving_period(&self) -> u64 {
        self.params.halving_period
    }

    pub fn updates_since_halving(&self) -> u64 {
        self.updates_since_halving
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(rate: u128, tail: u128, period: u64) -> EmissionSchedule {
        EmissionSchedule::new(EmissionParams {
            emission_rate: rate,
            tail_emission: tail,
            halving_period: period,
        })
        .unwrap()
    }

    /// Run one full state-update period and return its payout.
    fn tick(s: &mut EmissionSchedule) -> PeriodEmission {
        let e = s.begin_period();
        s.advance();
        e
    }

    #[test]
    fn test_zero_halving_period_rejected() {
        let result = EmissionSchedule::new(EmissionParams {
            emission_rate: 100,
            tail_emission: 1,
            halving_period: 0,
        });
        assert_eq!(result.unwrap_err(), EmissionError::InvalidHalvingPeriod);
    }

    #[test]
    fn test_rate_constant_within_period() {
        let mut s = schedule(1000, 10, 3);
        for _ in 0..3 {
            let e = tick(&mut s);
            assert_eq!(e.amount, 1000);
            assert!(e.halved.is_none());
        }
        assert_eq!(s.updates_since_halving(), 3);
    }

    #[test]
    fn test_halves_after_period_updates() {
        let mut s = schedule(1000, 10, 3);
        for _ in 0..3 {
            tick(&mut s);
        }
        let e = tick(&mut s);
        assert_eq!(e.amount, 500);
        assert_eq!(e.halved, Some((1000, 500)));
        assert_eq!(s.updates_since_halving(), 1);
        assert_eq!(s.version(), 1);

        // Regular cadence: next halving after another 3 updates.
        tick(&mut s);
        tick(&mut s);
        assert_eq!(tick(&mut s).amount, 250);
    }

    #[test]
    fn test_floor_division_on_odd_rate() {
        let mut s = schedule(101, 1, 1);
        tick(&mut s);
        assert_eq!(tick(&mut s).amount, 50);
    }

    #[test]
    fn test_stays_constant_at_tail() {
        let mut s = schedule(100, 100, 1);
        for _ in 0..10 {
            let e = tick(&mut s);
            assert_eq!(e.amount, 100);
            assert!(e.halved.is_none());
        }
    }

    #[test]
    fn test_halving_clamped_to_tail() {
        let mut s = schedule(30, 20, 1);
        tick(&mut s);
        let e = tick(&mut s);
        assert_eq!(e.amount, 20);
        assert_eq!(e.halved, Some((30, 20)));
        assert!(tick(&mut s).halved.is_none());
    }

    #[test]
    fn test_halve_state_time_rescales() {
        let mut s = schedule(1000, 100, 10);
        s.halve_state_time().unwrap();
        assert_eq!(s.emission_rate(), 500);
        assert_eq!(s.tail_emission(), 50);
        assert_eq!(s.halving_period(), 20);
        assert_eq!(s.version(), 1);
    }

    #[test]
    fn test_double_state_time_rescales() {
        let mut s = schedule(1000, 100, 10);
        s.double_state_time().unwrap();
        assert_eq!(s.emission_rate(), 2000);
        assert_eq!(s.tail_emission(), 200);
        assert_eq!(s.halving_period(), 5);
    }

    #[test]
    fn test_double_state_time_rejects_zero_period() {
        let mut s = schedule(1000, 100, 1);
        let before = s;
        assert_eq!(s.double_state_time(), Err(EmissionError::InvalidHalvingPeriod));
        assert_eq!(s, before);
    }

    #[test]
    fn test_double_state_time_overflow_leaves_state_untouched() {
        let mut s = schedule(u128::MAX, 1, 4);
        let before = s;
        assert_eq!(s.double_state_time(), Err(EmissionError::Overflow));
        assert_eq!(s, before);
    }
}
