//! A cloneable, thread-safe handle on one [`StakingEngine`].
//!
//! Every operation runs under one exclusive lock, so concurrent callers see
//! the ledger move from one committed state to the next with nothing in
//! between.

use std::sync::{Arc, Mutex, MutexGuard};

use tally_store::StakingStore;
use tally_types::{AccountId, Timestamp};

use crate::custody::ValueLedger;
use crate::engine::StakingEngine;
use crate::retention::CompactionReport;
use crate::rewards::DistributionReport;
use crate::state::{LedgerSummary, StakingState};
use crate::StakingError;

pub struct SharedEngine<S, L> {
    inner: Arc<Mutex<StakingEngine<S, L>>>,
}

impl<S, L> Clone for SharedEngine<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StakingStore, L: ValueLedger> SharedEngine<S, L> {
    pub fn new(engine: StakingEngine<S, L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StakingEngine<S, L>>, StakingError> {
        self.inner.lock().map_err(|_| StakingError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<T>(
        &self,
        f: impl FnOnce(&mut StakingEngine<S, L>) -> Result<T, StakingError>,
    ) -> Result<T, StakingError> {
        let mut engine = self.lock()?;
        f(&mut engine)
    }

    /// Run a read-only query against the current state.
    pub fn read<T>(&self, f: impl FnOnce(&StakingState) -> T) -> Result<T, StakingError> {
        let engine = self.lock()?;
        Ok(f(engine.state()))
    }

    pub fn stake(&self, account: &AccountId, amount: u128, now: Timestamp) -> Result<u128, StakingError> {
        self.with(|engine| engine.stake(account, amount, now))
    }

    pub fn unstake(&self, account: &AccountId, amount: u128, now: Timestamp) -> Result<u128, StakingError> {
        self.with(|engine| engine.unstake(account, amount, now))
    }

    pub fn add_reward(&self, depositor: &AccountId, amount: u128) -> Result<(), StakingError> {
        self.with(|engine| engine.add_reward(depositor, amount))
    }

    pub fn distribute_reward(&self, caller: &AccountId, now: Timestamp) -> Result<DistributionReport, StakingError> {
        self.with(|engine| engine.distribute_reward(caller, now))
    }

    pub fn claim_reward(
        &self,
        account: &AccountId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<u128, StakingError> {
        self.with(|engine| engine.claim_reward(account, amount, recipient))
    }

    pub fn compact(&self, now: Timestamp) -> Result<CompactionReport, StakingError> {
        self.with(|engine| engine.compact(now))
    }

    pub fn summary(&self) -> Result<LedgerSummary, StakingError> {
        Ok(self.lock()?.summary())
    }

    pub fn staked_amount(&self, account: &AccountId) -> Result<u128, StakingError> {
        self.read(|state| state.staked_amount(account))
    }

    pub fn staking_profit(&self, account: &AccountId) -> Result<u128, StakingError> {
        self.read(|state| state.staking_profit(account))
    }
}
