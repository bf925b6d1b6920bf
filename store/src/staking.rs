use crate::{AccountRecord, GlobalRecord, StoreError, WriteBatch};
use tally_types::{AccountId, Checkpoint, Timestamp};

/// Store trait for persisting staking ledger state to durable storage.
///
/// Reads are point lookups or ordered scans; every write goes through
/// [`StakingStore::commit`] so a ledger operation lands as a single
/// crash-consistent unit.
pub trait StakingStore {
    /// Global scalars, or `None` for a fresh store.
    fn get_globals(&self) -> Result<Option<GlobalRecord>, StoreError>;

    fn get_account(&self, id: &AccountId) -> Result<Option<AccountRecord>, StoreError>;

    /// Every account with recorded history, in id order.
    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError>;

    /// The checkpoint log of one account, oldest first.
    fn checkpoints(&self, id: &AccountId) -> Result<Vec<Checkpoint>, StoreError>;

    /// The latest checkpoint dated at or before `at`, if any.
    fn checkpoint_at(&self, id: &AccountId, at: Timestamp) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self
            .checkpoints(id)?
            .into_iter()
            .take_while(|cp| cp.at <= at)
            .last())
    }

    /// Blacklisted accounts, in id order.
    fn blacklist(&self) -> Result<Vec<AccountId>, StoreError>;

    /// Apply a batch atomically.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
