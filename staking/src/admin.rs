//! Admin-gated parameter and blacklist changes.

use tally_store::{BatchOp, StakingStore, WriteBatch};
use tally_types::{AccountId, Timestamp};

use crate::custody::ValueLedger;
use crate::engine::StakingEngine;
use crate::StakingError;

impl<S: StakingStore, L: ValueLedger> StakingEngine<S, L> {
    /// Change the rolling window. Running maturity clocks keep their start;
    /// validity and averages are measured against the new window from now on.
    pub fn set_rolling_window(&mut self, caller: &AccountId, secs: u64) -> Result<(), StakingError> {
        self.state.require_admin(caller, "set the rolling window")?;
        if secs == 0 {
            return Err(StakingError::InvalidAmount("rolling window must be positive".into()));
        }
        let mut globals = self.state.globals().clone();
        let previous = globals.rolling_window_secs;
        globals.rolling_window_secs = secs;

        let mut batch = WriteBatch::new();
        batch.put_globals(&globals);
        self.store.commit(batch)?;

        self.state.install_globals(globals);
        tracing::info!(previous, rolling_window_secs = secs, "rolling window changed");
        Ok(())
    }

    /// Change the minimum stake and re-evaluate every maturity clock
    /// against it: accounts now below stop maturing, accounts newly at or
    /// above start maturing at `now`. Returns how many clocks changed.
    pub fn set_min_stake(&mut self, caller: &AccountId, amount: u128, now: Timestamp) -> Result<usize, StakingError> {
        self.state.require_admin(caller, "set the minimum stake")?;
        if amount == 0 {
            return Err(StakingError::InvalidAmount("minimum stake must be positive".into()));
        }
        let mut globals = self.state.globals().clone();
        let previous = globals.min_stake;
        globals.min_stake = amount;

        let mut staged = Vec::new();
        for account in self.state.accounts() {
            let mut account = account.clone();
            if account.rebase_threshold(amount, now) {
                staged.push(account);
            }
        }

        let mut batch = WriteBatch::new();
        for account in &staged {
            batch.put_account(account.record());
        }
        batch.put_globals(&globals);
        self.store.commit(batch)?;

        let rebased = staged.len();
        self.state.install(staged, globals);
        tracing::info!(previous, min_stake = amount, rebased, "minimum stake changed");
        Ok(rebased)
    }

    /// Returns `false` if the account was already blacklisted.
    pub fn add_to_blacklist(&mut self, caller: &AccountId, account: &AccountId) -> Result<bool, StakingError> {
        self.state.require_admin(caller, "change the blacklist")?;
        if self.state.is_blacklisted(account) {
            return Ok(false);
        }
        let mut batch = WriteBatch::new();
        batch.push(BatchOp::PutBlacklisted(account.clone()));
        self.store.commit(batch)?;

        self.state.blacklist.insert(account.clone());
        tracing::info!(%account, "account blacklisted");
        Ok(true)
    }

    /// Returns `false` if the account was not blacklisted.
    pub fn remove_from_blacklist(&mut self, caller: &AccountId, account: &AccountId) -> Result<bool, StakingError> {
        self.state.require_admin(caller, "change the blacklist")?;
        if !self.state.is_blacklisted(account) {
            return Ok(false);
        }
        let mut batch = WriteBatch::new();
        batch.push(BatchOp::RemoveBlacklisted(account.clone()));
        self.store.commit(batch)?;

        self.state.blacklist.remove(account);
        tracing::info!(%account, "account removed from blacklist");
        Ok(true)
    }

    /// Public read.
    pub fn list_blacklist(&self) -> Vec<AccountId> {
        self.state.list_blacklist()
    }
}
