//! Reward deposits and batch proportional distribution.
//!
//! `share(a) = floor(pool × avg(a, now) / Σ avg(·, now))`
//!
//! Distribution is a single pass over every account with history, so its
//! cost grows with the account set; treat it as a rate-limited admin
//! action rather than a per-transaction primitive.

use serde::{Deserialize, Serialize};
use tally_store::{StakingStore, WriteBatch};
use tally_types::{AccountId, Timestamp};

use crate::custody::ValueLedger;
use crate::engine::StakingEngine;
use crate::math::mul_div_floor;
use crate::StakingError;

/// What happens to the integer-division remainder of a distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Stays undistributed and joins the next round's pool.
    #[default]
    RollForward,
    /// Withheld from all future rounds; stays in custody.
    Retire,
}

/// Outcome of one distribution round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionReport {
    pub at: Timestamp,
    /// Undistributed reward at the start of the round.
    pub pool: u128,
    pub total_average: u128,
    /// Non-zero credits, in account id order.
    pub credited: Vec<(AccountId, u128)>,
    pub distributed: u128,
    /// `pool − distributed`.
    pub remainder: u128,
    /// Portion of the remainder retired by [`RemainderPolicy::Retire`].
    pub retired: u128,
}

impl<S: StakingStore, L: ValueLedger> StakingEngine<S, L> {
    /// Pull `amount` of reward from `depositor` into custody.
    pub fn add_reward(&mut self, depositor: &AccountId, amount: u128) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("reward amount must be positive".into()));
        }
        let mut globals = self.state.globals().clone();
        globals.total_reward = globals
            .total_reward
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;

        let mut batch = WriteBatch::new();
        batch.put_globals(&globals);

        let custody = self.ledger.custody().clone();
        self.ledger.transfer_from(depositor, &custody, amount)?;
        self.commit_after_pull(depositor, amount, batch)?;

        self.state.install_globals(globals);
        tracing::info!(
            %depositor,
            amount,
            total_reward = self.state.total_reward(),
            "reward deposited"
        );
        Ok(())
    }

    /// Credit the undistributed reward to every account in proportion to
    /// its rolling-window average at `now`. Admin only.
    pub fn distribute_reward(&mut self, caller: &AccountId, now: Timestamp) -> Result<DistributionReport, StakingError> {
        self.state.require_admin(caller, "distribute rewards")?;

        let averages = self.state.averages(now)?;
        let total_average = averages
            .iter()
            .try_fold(0u128, |acc, (_, avg)| acc.checked_add(*avg))
            .ok_or(StakingError::Overflow)?;
        let pool = self.state.undistributed_reward();
        if total_average == 0 || pool == 0 {
            return Err(StakingError::NothingToDistribute {
                total_average,
                undistributed: pool,
            });
        }

        let mut staged = Vec::with_capacity(averages.len());
        let mut credited = Vec::with_capacity(averages.len());
        let mut distributed: u128 = 0;
        for (id, avg) in &averages {
            let share = mul_div_floor(pool, *avg, total_average)?;
            if share == 0 {
                continue;
            }
            let Some(account) = self.state.account(id) else {
                continue;
            };
            let mut account = account.clone();
            account.claimable_profit = account
                .claimable_profit
                .checked_add(share)
                .ok_or(StakingError::Overflow)?;
            distributed = distributed.checked_add(share).ok_or(StakingError::Overflow)?;
            tracing::debug!(account = %id, average = avg, share, "credited reward share");
            credited.push((id.clone(), share));
            staged.push(account);
        }

        let remainder = pool.checked_sub(distributed).ok_or(StakingError::Overflow)?;
        let retired = match self.state.config().remainder_policy {
            RemainderPolicy::RollForward => 0,
            RemainderPolicy::Retire => remainder,
        };

        let mut globals = self.state.globals().clone();
        globals.total_distributed = globals
            .total_distributed
            .checked_add(distributed)
            .ok_or(StakingError::Overflow)?;
        globals.total_retired = globals
            .total_retired
            .checked_add(retired)
            .ok_or(StakingError::Overflow)?;
        globals.last_distribution = Some(now);

        let mut batch = WriteBatch::new();
        for account in &staged {
            batch.put_account(account.record());
        }
        batch.put_globals(&globals);
        self.store.commit(batch)?;

        self.state.install(staged, globals);
        tracing::info!(
            pool,
            total_average,
            accounts = credited.len(),
            distributed,
            remainder,
            retired,
            "distributed rewards"
        );
        Ok(DistributionReport {
            at: now,
            pool,
            total_average,
            credited,
            distributed,
            remainder,
            retired,
        })
    }
}
