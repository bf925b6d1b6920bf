//! Persisted per-account scalar record.

use serde::{Deserialize, Serialize};
use tally_types::{AccountId, Timestamp};

/// Scalar fields of one staker account.
///
/// The balance history itself lives in the checkpoint log (see
/// [`crate::StakingStore::checkpoints`]); `balance` duplicates the last
/// checkpoint so summaries can be built without touching the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    /// Current staked balance.
    pub balance: u128,
    /// Since when the balance has continuously been at or above the
    /// minimum stake. `None` while below threshold.
    pub maturity_start: Option<Timestamp>,
    /// Timestamp of the very first checkpoint ever written for this account.
    pub first_staked_at: Timestamp,
    /// Cumulative reward credited by distributions.
    pub claimable_profit: u128,
    /// Cumulative reward withdrawn.
    pub claimed: u128,
    /// Checkpoints older than this were compacted away.
    #[serde(default)]
    pub history_horizon: Option<Timestamp>,
}

impl AccountRecord {
    /// Record for an account whose first stake lands at `at`.
    pub fn opened(id: AccountId, at: Timestamp) -> Self {
        Self {
            id,
            balance: 0,
            maturity_start: None,
            first_staked_at: at,
            claimable_profit: 0,
            claimed: 0,
            history_horizon: None,
        }
    }
}
