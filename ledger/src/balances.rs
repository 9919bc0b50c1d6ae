//! Balance ledger: spendable balances and total supply.
//!
//! `total_supply` counts every materialized token: spendable balances plus
//! tokens held in job escrow and in validator custody. Moving tokens into or
//! out of escrow/custody (`debit` / `credit`) leaves the supply untouched;
//! only `mint` and `retire` change it.

use crate::error::LedgerError;
use std::collections::HashMap;
use tasknet_types::Address;

#[derive(Clone, Debug, Default)]
pub struct BalanceSheet {
    balances: HashMap<Address, u128>,
    total_supply: u128,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(balances: HashMap<Address, u128>, total_supply: u128) -> Self {
        Self {
            balances,
            total_supply,
        }
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Sum of all spendable balances, saturating.
    pub fn sum_of_balances(&self) -> u128 {
        self.balances
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter()
    }

    /// Number of accounts holding a non-zero balance.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    pub fn ensure_available(&self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Check that crediting `amount` to `address` cannot overflow.
    pub fn ensure_credit(&self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        self.balance_of(address)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(LedgerError::Overflow)
    }

    /// Issue new tokens to `to`.
    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(to.clone(), balance);
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.ensure_available(from, amount)?;
        if from == to {
            return Ok(());
        }
        self.ensure_credit(to, amount)?;
        self.set(from, self.balance_of(from) - amount);
        self.set(to, self.balance_of(to) + amount);
        Ok(())
    }

    /// Move `amount` out of `from`'s spendable balance (into escrow or
    /// custody). Supply is unchanged.
    pub fn debit(&mut self, from: &Address, amount: u128) -> Result<(), LedgerError> {
        self.ensure_available(from, amount)?;
        self.set(from, self.balance_of(from) - amount);
        Ok(())
    }

    /// Return `amount` from escrow or custody to `to`. Supply is unchanged.
    pub fn credit(&mut self, to: &Address, amount: u128) -> Result<(), LedgerError> {
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.set(to, balance);
        Ok(())
    }

    /// Take `amount` out of circulation (escrowed job payments released into
    /// the reward pool). A zero amount is a no-op.
    pub fn retire(&mut self, amount: u128) -> Result<(), LedgerError> {
        self.total_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn set(&mut self, address: &Address, balance: u128) {
        if balance == 0 {
            self.balances.remove(address);
        } else {
            self.balances.insert(address.clone(), balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(name: &str) -> Address {
        Address::new(format!("tn_{name}"))
    }

    #[test]
    fn test_mint_increases_balance_and_supply() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), 500).unwrap();
        sheet.mint(&addr("alice"), 250).unwrap();
        assert_eq!(sheet.balance_of(&addr("alice")), 750);
        assert_eq!(sheet.total_supply(), 750);
    }

    #[test]
    fn test_mint_zero_rejected() {
        let mut sheet = BalanceSheet::new();
        assert!(matches!(sheet.mint(&addr("alice"), 0), Err(LedgerError::InvalidAmount)));
    }

    #[test]
    fn test_mint_overflow_rejected_without_effect() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), u128::MAX).unwrap();
        let result = sheet.mint(&addr("bob"), 1);
        assert!(matches!(result, Err(LedgerError::Overflow)));
        assert_eq!(sheet.balance_of(&addr("bob")), 0);
        assert_eq!(sheet.total_supply(), u128::MAX);
    }

    #[test]
    fn test_transfer_moves_exact_amount() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), 100).unwrap();
        sheet.transfer(&addr("alice"), &addr("bob"), 40).unwrap();
        assert_eq!(sheet.balance_of(&addr("alice")), 60);
        assert_eq!(sheet.balance_of(&addr("bob")), 40);
        assert_eq!(sheet.total_supply(), 100);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), 10).unwrap();
        match sheet.transfer(&addr("alice"), &addr("bob"), 11) {
            Err(LedgerError::InsufficientBalance { needed, available }) => {
                assert_eq!(needed, 11);
                assert_eq!(available, 10);
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
        assert_eq!(sheet.balance_of(&addr("alice")), 10);
    }

    #[test]
    fn test_transfer_to_self_is_noop() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), 10).unwrap();
        sheet.transfer(&addr("alice"), &addr("alice"), 10).unwrap();
        assert_eq!(sheet.balance_of(&addr("alice")), 10);
    }

    #[test]
    fn test_emptied_accounts_are_dropped() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), 10).unwrap();
        sheet.debit(&addr("alice"), 10).unwrap();
        assert_eq!(sheet.account_count(), 0);
        assert_eq!(sheet.total_supply(), 10);
    }

    #[test]
    fn test_retire_reduces_supply_only() {
        let mut sheet = BalanceSheet::new();
        sheet.mint(&addr("alice"), 10).unwrap();
        sheet.debit(&addr("alice"), 4).unwrap();
        sheet.retire(4).unwrap();
        assert_eq!(sheet.total_supply(), 6);
        assert_eq!(sheet.balance_of(&addr("alice")), 6);
        assert!(matches!(sheet.retire(7), Err(LedgerError::Overflow)));
    }
}
