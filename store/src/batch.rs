//! Write batches: the unit of atomicity for every ledger mutation.
//!
//! A ledger operation stages all of its effects into one [`WriteBatch`]
//! and hands it to [`crate::StakingStore::commit`]. Backends must apply
//! the batch atomically: either every op lands or none does.

use crate::{AccountRecord, GlobalRecord};
use tally_types::{AccountId, Checkpoint, Timestamp};

/// One storage operation inside a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    PutGlobals(GlobalRecord),
    PutAccount(AccountRecord),
    /// Write a checkpoint. A checkpoint with the same account and
    /// timestamp is overwritten.
    PutCheckpoint {
        account: AccountId,
        checkpoint: Checkpoint,
    },
    /// Delete the checkpoint of `account` dated exactly `at`.
    DeleteCheckpoint {
        account: AccountId,
        at: Timestamp,
    },
    /// Delete every checkpoint of `account` dated strictly before `before`.
    PruneCheckpoints {
        account: AccountId,
        before: Timestamp,
    },
    PutBlacklisted(AccountId),
    RemoveBlacklisted(AccountId),
}

/// An ordered list of operations applied atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: BatchOp) {
        self.ops.push(op);
    }

    pub fn put_globals(&mut self, globals: &GlobalRecord) {
        self.push(BatchOp::PutGlobals(globals.clone()));
    }

    pub fn put_account(&mut self, record: AccountRecord) {
        self.push(BatchOp::PutAccount(record));
    }

    pub fn put_checkpoint(&mut self, account: &AccountId, checkpoint: Checkpoint) {
        self.push(BatchOp::PutCheckpoint {
            account: account.clone(),
            checkpoint,
        });
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}
