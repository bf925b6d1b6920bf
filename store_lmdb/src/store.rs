//! LMDB implementation of [`StakingStore`].

use std::ops::Bound;
use std::path::Path;

use heed::RwTxn;
use tally_store::{AccountRecord, BatchOp, GlobalRecord, StakingStore, StoreError, WriteBatch};
use tally_types::{AccountId, Checkpoint, Timestamp};

use crate::environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
use crate::LmdbError;

const GLOBALS_KEY: &[u8] = b"globals";

/// Staking ledger store backed by a single LMDB environment.
///
/// Every [`WriteBatch`] is applied inside one LMDB write transaction, so a
/// crash mid-commit leaves the previous state intact.
pub struct LmdbStakingStore {
    env: LmdbEnvironment,
}

impl LmdbStakingStore {
    pub fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }

    /// Open (or create) a store in `path` with the default map size.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(LmdbEnvironment::open(path, DEFAULT_MAP_SIZE)?))
    }

    fn apply(&self, txn: &mut RwTxn<'_>, op: BatchOp) -> Result<(), LmdbError> {
        match op {
            BatchOp::PutGlobals(globals) => {
                let bytes = bincode::serialize(&globals)?;
                self.env.globals_db.put(txn, GLOBALS_KEY, &bytes)?;
            }
            BatchOp::PutAccount(record) => {
                let bytes = bincode::serialize(&record)?;
                self.env
                    .accounts_db
                    .put(txn, record.id.as_str().as_bytes(), &bytes)?;
            }
            BatchOp::PutCheckpoint {
                account,
                checkpoint,
            } => {
                let key = checkpoint_key(&account, checkpoint.at)?;
                self.env
                    .checkpoints_db
                    .put(txn, &key, &checkpoint.balance.to_be_bytes())?;
            }
            BatchOp::DeleteCheckpoint { account, at } => {
                let key = checkpoint_key(&account, at)?;
                self.env.checkpoints_db.delete(txn, &key)?;
            }
            BatchOp::PruneCheckpoints { account, before } => {
                let prefix = checkpoint_prefix(&account)?;
                let stale: Vec<Vec<u8>> = {
                    let mut stale = Vec::new();
                    for item in self.env.checkpoints_db.prefix_iter(txn, &prefix)? {
                        let (key, _) = item?;
                        if decode_timestamp(key, prefix.len())? < before {
                            stale.push(key.to_vec());
                        } else {
                            break;
                        }
                    }
                    stale
                };
                for key in &stale {
                    self.env.checkpoints_db.delete(txn, key)?;
                }
            }
            BatchOp::PutBlacklisted(account) => {
                self.env
                    .blacklist_db
                    .put(txn, account.as_str().as_bytes(), &[])?;
            }
            BatchOp::RemoveBlacklisted(account) => {
                self.env
                    .blacklist_db
                    .delete(txn, account.as_str().as_bytes())?;
            }
        }
        Ok(())
    }
}

impl StakingStore for LmdbStakingStore {
    fn get_globals(&self) -> Result<Option<GlobalRecord>, StoreError> {
        let txn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self.env.globals_db.get(&txn, GLOBALS_KEY).map_err(LmdbError::from)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn get_account(&self, id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        let txn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self
            .env
            .accounts_db
            .get(&txn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn iter_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let txn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for item in self.env.accounts_db.iter(&txn).map_err(LmdbError::from)? {
            let (_, bytes) = item.map_err(LmdbError::from)?;
            records.push(bincode::deserialize(bytes).map_err(LmdbError::from)?);
        }
        Ok(records)
    }

    fn checkpoints(&self, id: &AccountId) -> Result<Vec<Checkpoint>, StoreError> {
        let prefix = checkpoint_prefix(id)?;
        let txn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut log = Vec::new();
        for item in self
            .env
            .checkpoints_db
            .prefix_iter(&txn, &prefix)
            .map_err(LmdbError::from)?
        {
            let (key, value) = item.map_err(LmdbError::from)?;
            log.push(Checkpoint::new(
                decode_timestamp(key, prefix.len())?,
                decode_balance(value)?,
            ));
        }
        Ok(log)
    }

    fn checkpoint_at(&self, id: &AccountId, at: Timestamp) -> Result<Option<Checkpoint>, StoreError> {
        let lower = checkpoint_key(id, Timestamp::EPOCH)?;
        let upper = checkpoint_key(id, at)?;
        let range = (Bound::Included(lower.as_slice()), Bound::Included(upper.as_slice()));
        let txn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut iter = self
            .env
            .checkpoints_db
            .rev_range(&txn, &range)
            .map_err(LmdbError::from)?;
        match iter.next() {
            Some(item) => {
                let (key, value) = item.map_err(LmdbError::from)?;
                Ok(Some(Checkpoint::new(
                    decode_timestamp(key, lower.len() - 8)?,
                    decode_balance(value)?,
                )))
            }
            None => Ok(None),
        }
    }

    fn blacklist(&self) -> Result<Vec<AccountId>, StoreError> {
        let txn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for item in self.env.blacklist_db.iter(&txn).map_err(LmdbError::from)? {
            let (key, _) = item.map_err(LmdbError::from)?;
            let raw = std::str::from_utf8(key)
                .map_err(|e| LmdbError::Malformed(format!("blacklist key: {e}")))?;
            let id = AccountId::parse(raw)
                .ok_or_else(|| LmdbError::Malformed("empty blacklist key".into()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let ops = batch.len();
        let mut txn = self.env.env().write_txn().map_err(LmdbError::from)?;
        for op in batch {
            // Dropping `txn` on error aborts the whole batch.
            self.apply(&mut txn, op)?;
        }
        txn.commit().map_err(LmdbError::from)?;
        tracing::trace!(ops, "committed write batch");
        Ok(())
    }
}

// ── Key encoding ───────────────────────────────────────────────────────

fn checkpoint_prefix(id: &AccountId) -> Result<Vec<u8>, LmdbError> {
    let raw = id.as_str().as_bytes();
    let len = u16::try_from(raw.len())
        .map_err(|_| LmdbError::Malformed(format!("account id too long: {} bytes", raw.len())))?;
    let mut key = Vec::with_capacity(2 + raw.len() + 8);
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(raw);
    Ok(key)
}

fn checkpoint_key(id: &AccountId, at: Timestamp) -> Result<Vec<u8>, LmdbError> {
    let mut key = checkpoint_prefix(id)?;
    key.extend_from_slice(&at.as_secs().to_be_bytes());
    Ok(key)
}

fn decode_timestamp(key: &[u8], prefix_len: usize) -> Result<Timestamp, LmdbError> {
    let suffix: [u8; 8] = key
        .get(prefix_len..)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LmdbError::Malformed("checkpoint key without timestamp".into()))?;
    Ok(Timestamp::new(u64::from_be_bytes(suffix)))
}

fn decode_balance(value: &[u8]) -> Result<u128, LmdbError> {
    let raw: [u8; 16] = value
        .try_into()
        .map_err(|_| LmdbError::Malformed(format!("checkpoint value of {} bytes", value.len())))?;
    Ok(u128::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, LmdbStakingStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStakingStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    #[test]
    fn fresh_store_is_empty() {
        let (_dir, store) = open_temp();
        assert!(store.get_globals().unwrap().is_none());
        assert!(store.iter_accounts().unwrap().is_empty());
        assert!(store.checkpoints(&alice()).unwrap().is_empty());
        assert!(store.blacklist().unwrap().is_empty());
    }

    #[test]
    fn batch_round_trips_records() {
        let (_dir, store) = open_temp();
        let mut batch = WriteBatch::new();
        let mut globals = GlobalRecord::new(86_400, 500);
        globals.total_locked = 700;
        batch.put_globals(&globals);
        let mut record = AccountRecord::opened(alice(), Timestamp::new(10));
        record.balance = 700;
        batch.put_account(record.clone());
        batch.put_checkpoint(&alice(), Checkpoint::new(Timestamp::new(10), 700));
        batch.push(BatchOp::PutBlacklisted(AccountId::new("mallory")));
        store.commit(batch).unwrap();

        assert_eq!(store.get_globals().unwrap(), Some(globals));
        assert_eq!(store.get_account(&alice()).unwrap(), Some(record));
        assert_eq!(store.blacklist().unwrap(), vec![AccountId::new("mallory")]);
    }

    #[test]
    fn same_instant_checkpoint_overwrites() {
        let (_dir, store) = open_temp();
        let mut batch = WriteBatch::new();
        batch.put_checkpoint(&alice(), Checkpoint::new(Timestamp::new(5), 100));
        batch.put_checkpoint(&alice(), Checkpoint::new(Timestamp::new(5), 300));
        store.commit(batch).unwrap();

        assert_eq!(
            store.checkpoints(&alice()).unwrap(),
            vec![Checkpoint::new(Timestamp::new(5), 300)]
        );
    }

    #[test]
    fn checkpoint_at_finds_governing_entry() {
        let (_dir, store) = open_temp();
        let mut batch = WriteBatch::new();
        for (t, b) in [(10, 100), (20, 300), (30, 0)] {
            batch.put_checkpoint(&alice(), Checkpoint::new(Timestamp::new(t), b));
        }
        // A second account sharing a prefix must not leak into alice's scans.
        batch.put_checkpoint(&AccountId::new("alice2"), Checkpoint::new(Timestamp::new(15), 9));
        store.commit(batch).unwrap();

        assert_eq!(store.checkpoint_at(&alice(), Timestamp::new(9)).unwrap(), None);
        assert_eq!(
            store.checkpoint_at(&alice(), Timestamp::new(25)).unwrap(),
            Some(Checkpoint::new(Timestamp::new(20), 300))
        );
        assert_eq!(
            store.checkpoint_at(&alice(), Timestamp::new(30)).unwrap(),
            Some(Checkpoint::new(Timestamp::new(30), 0))
        );
        assert_eq!(store.checkpoints(&alice()).unwrap().len(), 3);
    }

    #[test]
    fn prune_removes_only_older_checkpoints() {
        let (_dir, store) = open_temp();
        let mut batch = WriteBatch::new();
        for t in [10, 20, 30] {
            batch.put_checkpoint(&alice(), Checkpoint::new(Timestamp::new(t), t as u128));
        }
        store.commit(batch).unwrap();

        let mut prune = WriteBatch::new();
        prune.push(BatchOp::PruneCheckpoints {
            account: alice(),
            before: Timestamp::new(20),
        });
        store.commit(prune).unwrap();

        let remaining: Vec<u64> = store
            .checkpoints(&alice())
            .unwrap()
            .iter()
            .map(|cp| cp.at.as_secs())
            .collect();
        assert_eq!(remaining, vec![20, 30]);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LmdbStakingStore::open(dir.path()).unwrap();
            let mut batch = WriteBatch::new();
            batch.put_globals(&GlobalRecord::new(3_600, 1));
            batch.put_checkpoint(&alice(), Checkpoint::new(Timestamp::new(1), 42));
            store.commit(batch).unwrap();
        }
        let store = LmdbStakingStore::open(dir.path()).unwrap();
        assert_eq!(store.get_globals().unwrap().unwrap().rolling_window_secs, 3_600);
        assert_eq!(store.checkpoints(&alice()).unwrap()[0].balance, 42);
    }
}
