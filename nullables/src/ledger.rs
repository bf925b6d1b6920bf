//! Nullable value ledger: an in-memory fungible token with allowances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_staking::{TransferError, ValueLedger};
use tally_types::AccountId;

#[derive(Default)]
struct Balances {
    balances: HashMap<AccountId, u128>,
    /// (owner, spender) → approved amount.
    allowances: HashMap<(AccountId, AccountId), u128>,
}

impl Balances {
    fn balance(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn move_value(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        let available = self.balance(from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("balance of {to} would overflow")))?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// An in-memory value ledger bound to one custody account.
///
/// Transfers are all-or-nothing. [`NullValueLedger::fail_next_transfer`]
/// makes the next transfer of either kind fail without moving anything.
pub struct NullValueLedger {
    custody: AccountId,
    inner: Mutex<Balances>,
    fail_next: AtomicBool,
}

impl NullValueLedger {
    pub fn new(custody: AccountId) -> Self {
        Self {
            custody,
            inner: Mutex::new(Balances::default()),
            fail_next: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Balances> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit `amount` to `account` out of thin air.
    pub fn mint(&self, account: &AccountId, amount: u128) {
        let mut inner = self.lock();
        let balance = inner.balance(account).saturating_add(amount);
        inner.balances.insert(account.clone(), balance);
    }

    /// Let `spender` pull up to `amount` from `owner`, replacing any
    /// previous approval.
    pub fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u128) {
        self.lock()
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
    }

    /// Mint to `account` and approve custody for the same amount.
    pub fn fund(&self, account: &AccountId, amount: u128) {
        self.mint(account, amount);
        let custody = self.custody.clone();
        let approved = self.allowance(account, &custody).saturating_add(amount);
        self.approve(account, &custody, approved);
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.lock()
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_next_transfer(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> Result<(), TransferError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransferError::Rejected("injected failure".into()));
        }
        Ok(())
    }
}

impl ValueLedger for NullValueLedger {
    fn custody(&self) -> &AccountId {
        &self.custody
    }

    fn transfer(&self, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        self.injected_failure()?;
        self.lock().move_value(&self.custody, to, amount)
    }

    fn transfer_from(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        self.injected_failure()?;
        let mut inner = self.lock();
        let key = (from.clone(), self.custody.clone());
        let approved = inner.allowances.get(&key).copied().unwrap_or(0);
        if approved < amount {
            return Err(TransferError::InsufficientAllowance {
                owner: from.clone(),
                needed: amount,
                approved,
            });
        }
        inner.move_value(from, to, amount)?;
        inner.allowances.insert(key, approved - amount);
        Ok(())
    }

    fn balance_of(&self, account: &AccountId) -> u128 {
        self.lock().balance(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    #[test]
    fn pull_needs_allowance() {
        let ledger = NullValueLedger::new(id("custody"));
        ledger.mint(&id("alice"), 100);

        let err = ledger.transfer_from(&id("alice"), &id("custody"), 50).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientAllowance { approved: 0, .. }));

        ledger.approve(&id("alice"), &id("custody"), 60);
        ledger.transfer_from(&id("alice"), &id("custody"), 50).unwrap();
        assert_eq!(ledger.balance_of(&id("alice")), 50);
        assert_eq!(ledger.custody_balance(), 50);
        assert_eq!(ledger.allowance(&id("alice"), &id("custody")), 10);
    }

    #[test]
    fn failed_transfer_moves_nothing() {
        let ledger = NullValueLedger::new(id("custody"));
        ledger.mint(&id("alice"), 10);
        ledger.approve(&id("alice"), &id("custody"), 20);

        let err = ledger.transfer_from(&id("alice"), &id("custody"), 11).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(&id("alice")), 10);
        assert_eq!(ledger.allowance(&id("alice"), &id("custody")), 20);
    }

    #[test]
    fn injected_failure_fires_once() {
        let ledger = NullValueLedger::new(id("custody"));
        ledger.mint(&id("custody"), 10);
        ledger.fail_next_transfer();

        assert!(ledger.transfer(&id("bob"), 5).is_err());
        assert_eq!(ledger.custody_balance(), 10);
        ledger.transfer(&id("bob"), 5).unwrap();
        assert_eq!(ledger.balance_of(&id("bob")), 5);
    }
}
