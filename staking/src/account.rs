//! Per-account staking state and the maturity state machine.

use tally_store::AccountRecord;
use tally_types::{AccountId, Checkpoint, Timestamp};

use crate::checkpoint::{AppendOutcome, CheckpointLog};
use crate::StakingError;

/// Where an account stands relative to the minimum stake and the rolling
/// window. Time-driven transitions (Maturing → Matured) are observed on
/// query, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaturityState {
    /// No recorded history.
    Empty,
    BelowThreshold,
    /// At or above the minimum stake, but for less than one window.
    Maturing { since: Timestamp },
    Matured { since: Timestamp },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakerAccount {
    pub id: AccountId,
    pub history: CheckpointLog,
    /// `None` whenever the balance is below the minimum stake.
    pub maturity_start: Option<Timestamp>,
    pub first_staked_at: Timestamp,
    /// Cumulative reward credited by distributions.
    pub claimable_profit: u128,
    /// Cumulative reward withdrawn.
    pub claimed: u128,
    /// Reads before this instant were compacted away.
    pub history_horizon: Option<Timestamp>,
}

impl StakerAccount {
    /// A fresh account whose first checkpoint will land at `at`.
    pub fn open(id: AccountId, at: Timestamp) -> Self {
        Self {
            id,
            history: CheckpointLog::new(),
            maturity_start: None,
            first_staked_at: at,
            claimable_profit: 0,
            claimed: 0,
            history_horizon: None,
        }
    }

    /// Rebuild an account from its persisted record and checkpoint log.
    pub fn from_parts(record: AccountRecord, checkpoints: Vec<Checkpoint>) -> Result<Self, StakingError> {
        let history = CheckpointLog::from_entries(checkpoints)?;
        Ok(Self {
            id: record.id,
            history,
            maturity_start: record.maturity_start,
            first_staked_at: record.first_staked_at,
            claimable_profit: record.claimable_profit,
            claimed: record.claimed,
            history_horizon: record.history_horizon,
        })
    }

    pub fn record(&self) -> AccountRecord {
        AccountRecord {
            id: self.id.clone(),
            balance: self.balance(),
            maturity_start: self.maturity_start,
            first_staked_at: self.first_staked_at,
            claimable_profit: self.claimable_profit,
            claimed: self.claimed,
            history_horizon: self.history_horizon,
        }
    }

    pub fn balance(&self) -> u128 {
        self.history.current_balance()
    }

    /// Credited reward not yet withdrawn.
    pub fn available_credit(&self) -> u128 {
        self.claimable_profit.saturating_sub(self.claimed)
    }

    /// Move the balance to `new_balance` at `now`, checkpointing it and
    /// driving the maturity clock.
    ///
    /// The clock starts only on a below → at-or-above crossing and is
    /// cleared whenever the balance ends below `min_stake`; in every other
    /// case it is left untouched.
    pub fn set_balance(
        &mut self,
        new_balance: u128,
        now: Timestamp,
        min_stake: u128,
    ) -> Result<AppendOutcome, StakingError> {
        let previous = self.balance();
        let outcome = self.history.append(now, new_balance)?;
        if new_balance < min_stake {
            self.maturity_start = None;
        } else if previous < min_stake || self.maturity_start.is_none() {
            self.maturity_start = Some(now);
        }
        Ok(outcome)
    }

    /// Re-evaluate the maturity clock after the threshold itself moved.
    ///
    /// Returns `true` if the clock changed.
    pub fn rebase_threshold(&mut self, min_stake: u128, now: Timestamp) -> bool {
        let at_or_above = !self.history.is_empty() && self.balance() >= min_stake;
        match (at_or_above, self.maturity_start) {
            (false, Some(_)) => {
                self.maturity_start = None;
                true
            }
            (true, None) => {
                self.maturity_start = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Seconds since the maturity clock started; 0 when not running.
    pub fn time_elapsed(&self, now: Timestamp) -> u64 {
        self.maturity_start
            .map(|start| start.elapsed_since(now))
            .unwrap_or(0)
    }

    pub fn maturity(&self, now: Timestamp, min_stake: u128, rolling_window_secs: u64) -> MaturityState {
        if self.history.is_empty() {
            return MaturityState::Empty;
        }
        match self.maturity_start {
            Some(since) if self.balance() >= min_stake => {
                if since.has_expired(rolling_window_secs, now) {
                    MaturityState::Matured { since }
                } else {
                    MaturityState::Maturing { since }
                }
            }
            _ => MaturityState::BelowThreshold,
        }
    }

    /// Whether the account has held at least `min_stake` for a full window.
    pub fn is_valid(&self, now: Timestamp, min_stake: u128, rolling_window_secs: u64) -> bool {
        matches!(
            self.maturity(now, min_stake, rolling_window_secs),
            MaturityState::Matured { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u128 = 500;
    const DAY: u64 = 86_400;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn account() -> StakerAccount {
        StakerAccount::open(AccountId::new("alice"), ts(1_000))
    }

    #[test]
    fn clock_stays_off_below_threshold() {
        let mut a = account();
        a.set_balance(100, ts(1_000), MIN).unwrap();
        a.set_balance(300, ts(2_000), MIN).unwrap();
        assert_eq!(a.maturity_start, None);
        assert_eq!(a.time_elapsed(ts(5_000)), 0);
        assert_eq!(a.maturity(ts(5_000), MIN, DAY), MaturityState::BelowThreshold);
    }

    #[test]
    fn crossing_threshold_starts_clock() {
        let mut a = account();
        a.set_balance(300, ts(1_000), MIN).unwrap();
        a.set_balance(600, ts(2_000), MIN).unwrap();
        assert_eq!(a.maturity_start, Some(ts(2_000)));
        assert_eq!(a.time_elapsed(ts(2_000)), 0);
        assert!(!a.is_valid(ts(2_000 + DAY - 1), MIN, DAY));
        assert!(a.is_valid(ts(2_000 + DAY), MIN, DAY));
    }

    #[test]
    fn topping_up_never_resets_clock() {
        let mut a = account();
        a.set_balance(500, ts(1_000), MIN).unwrap();
        a.set_balance(900, ts(50_000), MIN).unwrap();
        assert_eq!(a.maturity_start, Some(ts(1_000)));
        a.set_balance(700, ts(60_000), MIN).unwrap();
        assert_eq!(a.maturity_start, Some(ts(1_000)));
    }

    #[test]
    fn dropping_below_clears_even_when_matured() {
        let mut a = account();
        a.set_balance(500, ts(1_000), MIN).unwrap();
        assert!(a.is_valid(ts(1_000 + 3 * DAY), MIN, DAY));
        a.set_balance(499, ts(1_000 + 3 * DAY), MIN).unwrap();
        assert_eq!(a.maturity_start, None);
        assert!(!a.is_valid(ts(1_000 + 3 * DAY), MIN, DAY));
    }

    #[test]
    fn threshold_rebase_follows_balance() {
        let mut a = account();
        a.set_balance(400, ts(1_000), MIN).unwrap();
        assert!(a.rebase_threshold(300, ts(2_000)));
        assert_eq!(a.maturity_start, Some(ts(2_000)));
        assert!(!a.rebase_threshold(300, ts(3_000)));
        assert!(a.rebase_threshold(1_000, ts(4_000)));
        assert_eq!(a.maturity_start, None);
    }

    #[test]
    fn empty_account_reports_empty() {
        assert_eq!(account().maturity(ts(10), MIN, DAY), MaturityState::Empty);
    }

    #[test]
    fn record_round_trip_preserves_fields() {
        let mut a = account();
        a.set_balance(700, ts(1_000), MIN).unwrap();
        a.claimable_profit = 40;
        a.claimed = 15;
        let rebuilt = StakerAccount::from_parts(a.record(), a.history.entries().to_vec()).unwrap();
        assert_eq!(rebuilt, a);
        assert_eq!(rebuilt.available_credit(), 25);
    }
}
