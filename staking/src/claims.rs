//! Claiming credited reward.

use tally_store::{StakingStore, WriteBatch};
use tally_types::AccountId;

use crate::custody::ValueLedger;
use crate::engine::StakingEngine;
use crate::StakingError;

impl<S: StakingStore, L: ValueLedger> StakingEngine<S, L> {
    /// Withdraw `amount` of `account`'s credited reward to `recipient`.
    /// Returns the credit left to claim.
    ///
    /// Never touches the staked balance or its checkpoints.
    pub fn claim_reward(
        &mut self,
        account: &AccountId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<u128, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("claim amount must be positive".into()));
        }
        let available = self.state.staking_profit(account);
        let previous = match self.state.account(account) {
            Some(existing) if amount <= available => existing.clone(),
            _ => {
                tracing::warn!(%account, requested = amount, available, "rejected over-claim");
                return Err(StakingError::InsufficientCredit {
                    requested: amount,
                    available,
                });
            }
        };

        let mut staged = previous.clone();
        staged.claimed = staged.claimed.checked_add(amount).ok_or(StakingError::Overflow)?;
        let mut globals = self.state.globals().clone();
        globals.total_claimed = globals
            .total_claimed
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;

        let mut batch = WriteBatch::new();
        batch.put_account(staged.record());
        batch.put_globals(&globals);
        let revert = self.state.revert_batch(&previous);

        self.store.commit(batch)?;
        self.push_after_commit(recipient, amount, revert)?;

        let remaining = staged.available_credit();
        self.state.install([staged], globals);
        tracing::info!(%account, %recipient, amount, remaining, "reward claimed");
        Ok(remaining)
    }
}
