//! Persisted ledger-wide scalars.

use serde::{Deserialize, Serialize};
use tally_types::Timestamp;

/// Global accounting state, stored as a single record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRecord {
    /// Rolling window: both the maturity period and the averaging window.
    pub rolling_window_secs: u64,
    /// Minimum balance for an account to start maturing.
    pub min_stake: u128,
    /// Cumulative reward ever deposited.
    pub total_reward: u128,
    /// Cumulative reward credited to accounts by distributions.
    pub total_distributed: u128,
    /// Distribution remainders permanently withheld from future rounds.
    pub total_retired: u128,
    /// Sum of all current staked balances.
    pub total_locked: u128,
    /// Cumulative reward withdrawn by all accounts.
    pub total_claimed: u128,
    pub last_distribution: Option<Timestamp>,
}

impl GlobalRecord {
    pub fn new(rolling_window_secs: u64, min_stake: u128) -> Self {
        Self {
            rolling_window_secs,
            min_stake,
            total_reward: 0,
            total_distributed: 0,
            total_retired: 0,
            total_locked: 0,
            total_claimed: 0,
            last_distribution: None,
        }
    }
}
