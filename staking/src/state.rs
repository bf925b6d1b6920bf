//! The owned ledger state and its read surface.
//!
//! [`StakingState`] is the single explicitly owned store object every
//! operation works against. It is pure in-memory accounting: loading it
//! from a [`StakingStore`] needs no value ledger, so read-only tools can
//! inspect a persisted ledger directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tally_store::{GlobalRecord, StakingStore, WriteBatch};
use tally_types::{AccountId, Timestamp};
use thiserror::Error;

use crate::account::{MaturityState, StakerAccount};
use crate::average::windowed_average;
use crate::config::StakingConfig;
use crate::StakingError;

pub struct StakingState {
    pub(crate) config: StakingConfig,
    pub(crate) globals: GlobalRecord,
    pub(crate) accounts: BTreeMap<AccountId, StakerAccount>,
    pub(crate) blacklist: BTreeSet<AccountId>,
}

/// Admin status report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub accounts: usize,
    pub blacklisted: usize,
    pub rolling_window_secs: u64,
    pub min_stake: u128,
    pub total_locked: u128,
    pub total_reward: u128,
    pub total_distributed: u128,
    pub total_retired: u128,
    pub total_claimed: u128,
    pub reward_treasury: u128,
    pub undistributed_reward: u128,
    pub last_distribution: Option<u64>,
    /// Present when the report was built with access to the value ledger.
    pub custody_balance: Option<u128>,
}

/// A broken ledger invariant, as found by [`StakingState::check_invariants`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("sum of balances {sum} differs from total locked {total_locked}")]
    LockedMismatch { sum: u128, total_locked: u128 },

    #[error("total claimed {total_claimed} exceeds total reward {total_reward}")]
    OverClaimed { total_claimed: u128, total_reward: u128 },

    #[error("distributed {distributed} plus retired {retired} exceeds total reward {total_reward}")]
    OverDistributed {
        distributed: u128,
        retired: u128,
        total_reward: u128,
    },

    #[error("{account}: claimed {claimed} exceeds credited {credited}")]
    AccountOverClaimed {
        account: AccountId,
        claimed: u128,
        credited: u128,
    },

    #[error("{account}: maturity clock running with balance {balance} below minimum")]
    MaturityBelowThreshold { account: AccountId, balance: u128 },

    #[error("{account}: balance {balance} at or above minimum but maturity clock stopped")]
    MaturityNotStarted { account: AccountId, balance: u128 },
}

impl StakingState {
    /// Fresh state seeded from `config`.
    pub fn new(config: StakingConfig) -> Self {
        let globals = GlobalRecord::new(config.rolling_window_secs, u128::from(config.min_stake));
        Self {
            config,
            globals,
            accounts: BTreeMap::new(),
            blacklist: BTreeSet::new(),
        }
    }

    /// Load persisted state, or seed a fresh one when the store is empty.
    ///
    /// The returned flag is `true` when the store held no ledger yet.
    pub fn load<S: StakingStore>(store: &S, config: StakingConfig) -> Result<(Self, bool), StakingError> {
        config.validate()?;
        let Some(globals) = store.get_globals()? else {
            return Ok((Self::new(config), true));
        };

        let mut accounts = BTreeMap::new();
        for record in store.iter_accounts()? {
            let checkpoints = store.checkpoints(&record.id)?;
            let account = StakerAccount::from_parts(record, checkpoints)?;
            accounts.insert(account.id.clone(), account);
        }
        let blacklist = store.blacklist()?.into_iter().collect();

        tracing::debug!(
            accounts = accounts.len(),
            total_locked = globals.total_locked,
            "loaded staking state"
        );
        Ok((
            Self {
                config,
                globals,
                accounts,
                blacklist,
            },
            false,
        ))
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub fn admin(&self) -> &AccountId {
        &self.config.admin
    }

    pub fn is_admin(&self, caller: &AccountId) -> bool {
        caller == &self.config.admin
    }

    pub(crate) fn require_admin(&self, caller: &AccountId, action: &'static str) -> Result<(), StakingError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            tracing::warn!(%caller, action, "rejected non-admin call");
            Err(StakingError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }

    // ── Accounts ───────────────────────────────────────────────────────

    pub fn account(&self, id: &AccountId) -> Option<&StakerAccount> {
        self.accounts.get(id)
    }

    /// Every account with recorded history, in id order.
    pub fn accounts(&self) -> impl Iterator<Item = &StakerAccount> {
        self.accounts.values()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn staked_amount(&self, id: &AccountId) -> u128 {
        self.account(id).map(StakerAccount::balance).unwrap_or(0)
    }

    /// Staked amount as of an arbitrary past (or future) instant.
    pub fn staked_amount_at(&self, id: &AccountId, at: Timestamp) -> Result<u128, StakingError> {
        let Some(account) = self.account(id) else {
            return Ok(0);
        };
        match account.history_horizon {
            Some(horizon) if at < horizon => Err(StakingError::HistoryPruned {
                account: id.clone(),
                horizon,
            }),
            _ => Ok(account.history.balance_at(at)),
        }
    }

    /// Maturity start; `None` (the "0 = not mature" sentinel)
    /// while below threshold.
    pub fn maturity_start(&self, id: &AccountId) -> Option<Timestamp> {
        self.account(id).and_then(|a| a.maturity_start)
    }

    pub fn time_elapsed(&self, id: &AccountId, now: Timestamp) -> u64 {
        self.account(id).map(|a| a.time_elapsed(now)).unwrap_or(0)
    }

    pub fn maturity(&self, id: &AccountId, now: Timestamp) -> MaturityState {
        self.account(id)
            .map(|a| a.maturity(now, self.globals.min_stake, self.globals.rolling_window_secs))
            .unwrap_or(MaturityState::Empty)
    }

    pub fn validity(&self, id: &AccountId, now: Timestamp) -> bool {
        matches!(self.maturity(id, now), MaturityState::Matured { .. })
    }

    // ── Averages ───────────────────────────────────────────────────────

    pub fn average(&self, id: &AccountId, now: Timestamp) -> Result<u128, StakingError> {
        match self.account(id) {
            Some(account) => self.average_of(account, now),
            None => Ok(0),
        }
    }

    fn average_of(&self, account: &StakerAccount, now: Timestamp) -> Result<u128, StakingError> {
        windowed_average(
            account,
            now,
            self.globals.rolling_window_secs,
            self.config.history_anchor,
        )
    }

    /// Non-zero averages of every account, in id order.
    pub fn averages(&self, now: Timestamp) -> Result<Vec<(AccountId, u128)>, StakingError> {
        let mut out = Vec::new();
        for account in self.accounts.values() {
            let avg = self.average_of(account, now)?;
            if avg > 0 {
                out.push((account.id.clone(), avg));
            }
        }
        Ok(out)
    }

    /// Σ average over all accounts: the distribution denominator.
    pub fn total_average(&self, now: Timestamp) -> Result<u128, StakingError> {
        self.averages(now)?
            .iter()
            .try_fold(0u128, |acc, (_, avg)| acc.checked_add(*avg))
            .ok_or(StakingError::Overflow)
    }

    // ── Rewards ────────────────────────────────────────────────────────

    /// Credited reward the account can still claim.
    pub fn staking_profit(&self, id: &AccountId) -> u128 {
        self.account(id).map(StakerAccount::available_credit).unwrap_or(0)
    }

    pub fn credited(&self, id: &AccountId) -> u128 {
        self.account(id).map(|a| a.claimable_profit).unwrap_or(0)
    }

    pub fn claimed(&self, id: &AccountId) -> u128 {
        self.account(id).map(|a| a.claimed).unwrap_or(0)
    }

    // ── Globals ────────────────────────────────────────────────────────

    pub fn globals(&self) -> &GlobalRecord {
        &self.globals
    }

    pub fn rolling_window_secs(&self) -> u64 {
        self.globals.rolling_window_secs
    }

    pub fn min_stake(&self) -> u128 {
        self.globals.min_stake
    }

    pub fn total_locked(&self) -> u128 {
        self.globals.total_locked
    }

    pub fn total_reward(&self) -> u128 {
        self.globals.total_reward
    }

    pub fn total_claimed(&self) -> u128 {
        self.globals.total_claimed
    }

    /// Reward still held in custody: deposited minus claimed.
    pub fn reward_treasury(&self) -> u128 {
        self.globals.total_reward.saturating_sub(self.globals.total_claimed)
    }

    /// Reward not yet credited to any account and not retired.
    pub fn undistributed_reward(&self) -> u128 {
        self.globals
            .total_reward
            .saturating_sub(self.globals.total_distributed)
            .saturating_sub(self.globals.total_retired)
    }

    pub fn last_distribution(&self) -> Option<Timestamp> {
        self.globals.last_distribution
    }

    pub fn is_blacklisted(&self, id: &AccountId) -> bool {
        self.blacklist.contains(id)
    }

    pub fn list_blacklist(&self) -> Vec<AccountId> {
        self.blacklist.iter().cloned().collect()
    }

    pub fn summary(&self, custody_balance: Option<u128>) -> LedgerSummary {
        LedgerSummary {
            accounts: self.accounts.len(),
            blacklisted: self.blacklist.len(),
            rolling_window_secs: self.globals.rolling_window_secs,
            min_stake: self.globals.min_stake,
            total_locked: self.globals.total_locked,
            total_reward: self.globals.total_reward,
            total_distributed: self.globals.total_distributed,
            total_retired: self.globals.total_retired,
            total_claimed: self.globals.total_claimed,
            reward_treasury: self.reward_treasury(),
            undistributed_reward: self.undistributed_reward(),
            last_distribution: self.globals.last_distribution.map(|t| t.as_secs()),
            custody_balance,
        }
    }

    // ── Audits ─────────────────────────────────────────────────────────

    /// Custody must back every staked unit plus every unclaimed reward unit.
    pub fn required_custody(&self) -> Option<u128> {
        self.globals.total_locked.checked_add(self.reward_treasury())
    }

    pub fn check_solvency(&self, custody_balance: u128) -> bool {
        self.required_custody()
            .map(|required| custody_balance >= required)
            .unwrap_or(false)
    }

    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let g = &self.globals;

        let sum = self
            .accounts
            .values()
            .fold(0u128, |acc, a| acc.saturating_add(a.balance()));
        if sum != g.total_locked {
            violations.push(InvariantViolation::LockedMismatch {
                sum,
                total_locked: g.total_locked,
            });
        }
        if g.total_claimed > g.total_reward {
            violations.push(InvariantViolation::OverClaimed {
                total_claimed: g.total_claimed,
                total_reward: g.total_reward,
            });
        }
        if g.total_distributed.saturating_add(g.total_retired) > g.total_reward {
            violations.push(InvariantViolation::OverDistributed {
                distributed: g.total_distributed,
                retired: g.total_retired,
                total_reward: g.total_reward,
            });
        }

        for account in self.accounts.values() {
            let balance = account.balance();
            if account.claimed > account.claimable_profit {
                violations.push(InvariantViolation::AccountOverClaimed {
                    account: account.id.clone(),
                    claimed: account.claimed,
                    credited: account.claimable_profit,
                });
            }
            match (account.maturity_start, balance >= g.min_stake) {
                (Some(_), false) => violations.push(InvariantViolation::MaturityBelowThreshold {
                    account: account.id.clone(),
                    balance,
                }),
                (None, true) => violations.push(InvariantViolation::MaturityNotStarted {
                    account: account.id.clone(),
                    balance,
                }),
                _ => {}
            }
        }
        violations
    }

    // ── Staging ────────────────────────────────────────────────────────

    /// Replace accounts and globals after their batch has been committed.
    pub(crate) fn install(&mut self, accounts: impl IntoIterator<Item = StakerAccount>, globals: GlobalRecord) {
        for account in accounts {
            self.accounts.insert(account.id.clone(), account);
        }
        self.globals = globals;
    }

    pub(crate) fn install_globals(&mut self, globals: GlobalRecord) {
        self.globals = globals;
    }

    /// Batch restoring `previous` and the current globals, used to roll
    /// back a committed batch.
    pub(crate) fn revert_batch(&self, previous: &StakerAccount) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.put_account(previous.record());
        batch.put_globals(&self.globals);
        batch
    }
}
