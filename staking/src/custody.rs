//! The external fungible value ledger the staking ledger holds custody in.
//!
//! The staking ledger never moves value itself. It asks a [`ValueLedger`]
//! bound to its custody account to pull stake and reward deposits in and to
//! push unstaked principal and claimed rewards out. Implementations must be
//! all-or-nothing: a failed transfer leaves every balance untouched.

use tally_types::AccountId;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("{account} holds {available}, cannot move {needed}")]
    InsufficientBalance {
        account: AccountId,
        needed: u128,
        available: u128,
    },

    #[error("{owner} approved {approved} for custody, cannot pull {needed}")]
    InsufficientAllowance {
        owner: AccountId,
        needed: u128,
        approved: u128,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Value ledger as seen from the custody account.
pub trait ValueLedger {
    /// The account this ledger moves value out of on [`ValueLedger::transfer`].
    fn custody(&self) -> &AccountId;

    /// Move `amount` from custody to `to`.
    fn transfer(&self, to: &AccountId, amount: u128) -> Result<(), TransferError>;

    /// Move `amount` from `from` to `to` using custody's allowance over `from`.
    fn transfer_from(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), TransferError>;

    fn balance_of(&self, account: &AccountId) -> u128;

    /// Current custody balance.
    fn custody_balance(&self) -> u128 {
        self.balance_of(self.custody())
    }
}
