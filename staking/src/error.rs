//! Staking ledger errors.

use tally_store::StoreError;
use tally_types::{AccountId, Timestamp};
use thiserror::Error;

use crate::custody::TransferError;

#[derive(Debug, Error)]
pub enum StakingError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: AccountId, action: &'static str },

    #[error("account {0} is blacklisted")]
    Blacklisted(AccountId),

    #[error("value ledger rejected transfer: {0}")]
    TransferFailure(#[from] TransferError),

    #[error("insufficient credit: requested {requested}, available {available}")]
    InsufficientCredit { requested: u128, available: u128 },

    #[error("nothing to distribute: total average {total_average}, undistributed {undistributed}")]
    NothingToDistribute { total_average: u128, undistributed: u128 },

    #[error("arithmetic overflow in staking computation")]
    Overflow,

    #[error("mutation at {at} precedes last checkpoint at {last}")]
    NonMonotonicTimestamp { last: Timestamp, at: Timestamp },

    #[error("history of {account} before {horizon} has been compacted")]
    HistoryPruned { account: AccountId, horizon: Timestamp },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ledger lock poisoned by a panicked writer")]
    LockPoisoned,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
