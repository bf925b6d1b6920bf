//! Stake and unstake.

use tally_store::{BatchOp, StakingStore, WriteBatch};
use tally_types::{AccountId, Checkpoint, Timestamp};

use crate::account::StakerAccount;
use crate::checkpoint::AppendOutcome;
use crate::custody::ValueLedger;
use crate::engine::StakingEngine;
use crate::StakingError;

impl<S: StakingStore, L: ValueLedger> StakingEngine<S, L> {
    /// Pull `amount` from `account` into custody and add it to the
    /// account's stake. Returns the new balance.
    ///
    /// The account record is created on first stake. Crossing the minimum
    /// stake from below starts the maturity clock at `now`; topping up an
    /// account that is already at or above the threshold never moves it.
    pub fn stake(&mut self, account: &AccountId, amount: u128, now: Timestamp) -> Result<u128, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("stake amount must be positive".into()));
        }
        if self.state.is_blacklisted(account) {
            tracing::warn!(%account, amount, "rejected stake from blacklisted account");
            return Err(StakingError::Blacklisted(account.clone()));
        }

        let mut staged = self
            .state
            .account(account)
            .cloned()
            .unwrap_or_else(|| StakerAccount::open(account.clone(), now));
        let new_balance = staged.balance().checked_add(amount).ok_or(StakingError::Overflow)?;
        staged.set_balance(new_balance, now, self.state.min_stake())?;

        let mut globals = self.state.globals().clone();
        globals.total_locked = globals
            .total_locked
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;

        let mut batch = WriteBatch::new();
        batch.put_account(staged.record());
        batch.put_checkpoint(account, Checkpoint::new(now, new_balance));
        batch.put_globals(&globals);

        let custody = self.ledger.custody().clone();
        self.ledger.transfer_from(account, &custody, amount)?;
        self.commit_after_pull(account, amount, batch)?;

        let maturity_start = staged.maturity_start;
        self.state.install([staged], globals);
        tracing::info!(
            %account,
            amount,
            balance = new_balance,
            maturity_start = ?maturity_start,
            "staked"
        );
        Ok(new_balance)
    }

    /// Return `amount` of `account`'s stake from custody. Returns the new
    /// balance.
    ///
    /// Ending below the minimum stake clears the maturity clock, even for
    /// an account that had already matured.
    pub fn unstake(&mut self, account: &AccountId, amount: u128, now: Timestamp) -> Result<u128, StakingError> {
        let current = self.state.staked_amount(account);
        if amount == 0 || amount > current {
            return Err(StakingError::InvalidAmount(format!(
                "cannot unstake {amount} from a balance of {current}"
            )));
        }
        let previous = match self.state.account(account) {
            Some(existing) => existing.clone(),
            None => return Err(StakingError::InvalidAmount(format!("{account} has no stake"))),
        };

        let mut staged = previous.clone();
        let new_balance = current - amount;
        let outcome = staged.set_balance(new_balance, now, self.state.min_stake())?;

        let mut globals = self.state.globals().clone();
        globals.total_locked = globals
            .total_locked
            .checked_sub(amount)
            .ok_or(StakingError::Overflow)?;

        let mut batch = WriteBatch::new();
        batch.put_account(staged.record());
        batch.put_checkpoint(account, Checkpoint::new(now, new_balance));
        batch.put_globals(&globals);

        let mut revert = self.state.revert_batch(&previous);
        match (outcome, previous.history.last()) {
            (AppendOutcome::Overwrote, Some(old)) => revert.put_checkpoint(account, *old),
            _ => revert.push(BatchOp::DeleteCheckpoint {
                account: account.clone(),
                at: now,
            }),
        }

        self.store.commit(batch)?;
        self.push_after_commit(account, amount, revert)?;

        self.state.install([staged], globals);
        tracing::info!(%account, amount, balance = new_balance, "unstaked");
        Ok(new_balance)
    }
}
