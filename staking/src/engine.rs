//! The staking engine. Owns the ledger state, its store and the custody
//! handle on the value ledger.
//!
//! Every mutating operation follows the same shape: stage the new account
//! and global records on copies, build one [`WriteBatch`], move value, and
//! only then replace the in-memory state. A failure at any step leaves the
//! previous state observable and persisted.
//!
//! Value moving in (stake, reward deposit) is pulled before the batch is
//! committed; if the commit then fails the pull is refunded. Value moving
//! out (unstake, claim) is pushed after the commit; if the push fails the
//! batch is rolled back with a compensating commit.

use tally_store::{StakingStore, WriteBatch};
use tally_types::AccountId;

use crate::config::StakingConfig;
use crate::custody::ValueLedger;
use crate::state::{LedgerSummary, StakingState};
use crate::StakingError;

pub struct StakingEngine<S, L> {
    pub(crate) state: StakingState,
    pub(crate) store: S,
    pub(crate) ledger: L,
}

impl<S: StakingStore, L: ValueLedger> StakingEngine<S, L> {
    /// Open the ledger persisted in `store`, seeding it from `config` when
    /// the store is empty.
    pub fn open(store: S, ledger: L, config: StakingConfig) -> Result<Self, StakingError> {
        if ledger.custody() != &config.custody {
            return Err(StakingError::InvalidConfig(format!(
                "value ledger is bound to {}, config expects custody {}",
                ledger.custody(),
                config.custody
            )));
        }
        let (state, fresh) = StakingState::load(&store, config)?;
        if fresh {
            let mut batch = WriteBatch::new();
            batch.put_globals(state.globals());
            store.commit(batch)?;
            tracing::info!(
                rolling_window_secs = state.rolling_window_secs(),
                min_stake = state.min_stake(),
                "initialised new staking ledger"
            );
        }
        Ok(Self { state, store, ledger })
    }

    pub fn state(&self) -> &StakingState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn custody(&self) -> &AccountId {
        self.ledger.custody()
    }

    pub fn summary(&self) -> LedgerSummary {
        self.state.summary(Some(self.ledger.custody_balance()))
    }

    /// Whether custody still backs all locked stake and unclaimed reward.
    pub fn is_solvent(&self) -> bool {
        self.state.check_solvency(self.ledger.custody_balance())
    }

    /// Commit a batch whose value was already pulled from `from`.
    /// On failure the pull is refunded before the error is returned.
    pub(crate) fn commit_after_pull(
        &self,
        from: &AccountId,
        amount: u128,
        batch: WriteBatch,
    ) -> Result<(), StakingError> {
        if let Err(err) = self.store.commit(batch) {
            match self.ledger.transfer(from, amount) {
                Ok(()) => tracing::warn!(%from, amount, error = %err, "commit failed, pull refunded"),
                Err(refund) => tracing::error!(
                    %from,
                    amount,
                    error = %err,
                    refund_error = %refund,
                    "commit failed and refund was rejected"
                ),
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Push `amount` out of custody after `batch` was committed; roll the
    /// batch back with `revert` if the push is rejected.
    pub(crate) fn push_after_commit(
        &self,
        to: &AccountId,
        amount: u128,
        revert: WriteBatch,
    ) -> Result<(), StakingError> {
        if let Err(err) = self.ledger.transfer(to, amount) {
            if let Err(store_err) = self.store.commit(revert) {
                tracing::error!(
                    %to,
                    amount,
                    error = %err,
                    store_error = %store_err,
                    "push rejected and rollback commit failed"
                );
            } else {
                tracing::warn!(%to, amount, error = %err, "push rejected, batch rolled back");
            }
            return Err(err.into());
        }
        Ok(())
    }
}
