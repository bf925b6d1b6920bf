//! Nullable store: thread-safe in-memory staking storage for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_store::{AccountRecord, BatchOp, GlobalRecord, StakingStore, StoreError, WriteBatch};
use tally_types::{AccountId, Checkpoint, Timestamp};

#[derive(Clone, Default)]
struct Tables {
    globals: Option<GlobalRecord>,
    accounts: BTreeMap<AccountId, AccountRecord>,
    checkpoints: BTreeMap<AccountId, BTreeMap<Timestamp, u128>>,
    blacklist: BTreeSet<AccountId>,
}

impl Tables {
    fn apply(&mut self, op: BatchOp) {
        match op {
            BatchOp::PutGlobals(globals) => self.globals = Some(globals),
            BatchOp::PutAccount(record) => {
                self.accounts.insert(record.id.clone(), record);
            }
            BatchOp::PutCheckpoint {
                account,
                checkpoint,
            } => {
                self.checkpoints
                    .entry(account)
                    .or_default()
                    .insert(checkpoint.at, checkpoint.balance);
            }
            BatchOp::DeleteCheckpoint { account, at } => {
                if let Some(log) = self.checkpoints.get_mut(&account) {
                    log.remove(&at);
                }
            }
            BatchOp::PruneCheckpoints { account, before } => {
                if let Some(log) = self.checkpoints.get_mut(&account) {
                    *log = log.split_off(&before);
                }
            }
            BatchOp::PutBlacklisted(account) => {
                self.blacklist.insert(account);
            }
            BatchOp::RemoveBlacklisted(account) => {
                self.blacklist.remove(&account);
            }
        }
    }
}

/// An in-memory [`StakingStore`].
///
/// Batches are applied to a copy and swapped in, so a commit is atomic.
/// [`NullStakingStore::fail_next_commit`] makes the next commit fail
/// without applying anything.
#[derive(Default)]
pub struct NullStakingStore {
    tables: Mutex<Tables>,
    fail_next: AtomicBool,
    commits: AtomicUsize,
}

impl NullStakingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of successfully applied batches.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn checkpoint_count(&self, id: &AccountId) -> usize {
        self.lock().checkpoints.get(id).map_or(0, BTreeMap::len)
    }
}

impl StakingStore for NullStakingStore {
    fn get_globals(&self) -> Result<Option<GlobalRecord>, StoreError> {
        Ok(self.lock().globals.clone())
    }

    fn get_account(&self, id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.lock().accounts.get(id).cloned())
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self.lock().accounts.values().cloned().collect())
    }

    fn checkpoints(&self, id: &AccountId) -> Result<Vec<Checkpoint>, StoreError> {
        Ok(self
            .lock()
            .checkpoints
            .get(id)
            .map(|log| {
                log.iter()
                    .map(|(&at, &balance)| Checkpoint::new(at, balance))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn blacklist(&self) -> Result<Vec<AccountId>, StoreError> {
        Ok(self.lock().blacklist.iter().cloned().collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut tables = self.lock();
        let mut staged = tables.clone();
        for op in batch {
            staged.apply(op);
        }
        *tables = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    #[test]
    fn failed_commit_applies_nothing() {
        let store = NullStakingStore::new();
        let mut batch = WriteBatch::new();
        batch.put_globals(&GlobalRecord::new(86_400, 100));
        batch.put_checkpoint(&id("alice"), Checkpoint::new(Timestamp::new(1), 5));

        store.fail_next_commit();
        assert!(store.commit(batch.clone()).is_err());
        assert!(store.get_globals().unwrap().is_none());
        assert_eq!(store.checkpoint_count(&id("alice")), 0);

        store.commit(batch).unwrap();
        assert_eq!(store.commit_count(), 1);
        assert_eq!(store.checkpoint_count(&id("alice")), 1);
    }

    #[test]
    fn prune_keeps_checkpoints_at_or_after_bound() {
        let store = NullStakingStore::new();
        let mut batch = WriteBatch::new();
        for at in [10, 20, 30] {
            batch.put_checkpoint(&id("alice"), Checkpoint::new(Timestamp::new(at), at as u128));
        }
        batch.push(BatchOp::PruneCheckpoints {
            account: id("alice"),
            before: Timestamp::new(20),
        });
        store.commit(batch).unwrap();

        let kept: Vec<u64> = store
            .checkpoints(&id("alice"))
            .unwrap()
            .iter()
            .map(|cp| cp.at.as_secs())
            .collect();
        assert_eq!(kept, vec![20, 30]);
    }
}
