//! Per-account append-only balance history.
//!
//! The log holds one [`Checkpoint`] per instant at which the balance
//! changed. Timestamps are strictly increasing: a second mutation in the
//! same instant overwrites the last entry instead of appending, so lookups
//! are a single binary search.

use serde::{Deserialize, Serialize};
use tally_types::{Checkpoint, Timestamp};

use crate::StakingError;

/// What [`CheckpointLog::append`] did with the new entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Same instant as the last checkpoint; its balance was replaced.
    Overwrote,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointLog {
    entries: Vec<Checkpoint>,
}

impl CheckpointLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted entries, rejecting out-of-order input.
    pub fn from_entries(entries: Vec<Checkpoint>) -> Result<Self, StakingError> {
        if let Some(pair) = entries.windows(2).find(|w| w[1].at <= w[0].at) {
            return Err(StakingError::NonMonotonicTimestamp {
                last: pair[0].at,
                at: pair[1].at,
            });
        }
        Ok(Self { entries })
    }

    /// Record `balance` as of `at`. O(1) amortized.
    pub fn append(&mut self, at: Timestamp, balance: u128) -> Result<AppendOutcome, StakingError> {
        match self.entries.last_mut() {
            Some(last) if at < last.at => Err(StakingError::NonMonotonicTimestamp { last: last.at, at }),
            Some(last) if at == last.at => {
                last.balance = balance;
                Ok(AppendOutcome::Overwrote)
            }
            _ => {
                self.entries.push(Checkpoint::new(at, balance));
                Ok(AppendOutcome::Appended)
            }
        }
    }

    /// Balance in effect at `at`, in O(log n).
    ///
    /// Zero before the first checkpoint; the current balance at or after
    /// the last one.
    pub fn balance_at(&self, at: Timestamp) -> u128 {
        let idx = self.entries.partition_point(|cp| cp.at <= at);
        if idx == 0 {
            0
        } else {
            self.entries[idx - 1].balance
        }
    }

    pub fn current_balance(&self) -> u128 {
        self.entries.last().map(|cp| cp.balance).unwrap_or(0)
    }

    pub fn first(&self) -> Option<&Checkpoint> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&Checkpoint> {
        self.entries.last()
    }

    /// Checkpoints dated strictly after `after` and at or before `until`.
    pub fn between(&self, after: Timestamp, until: Timestamp) -> &[Checkpoint] {
        let start = self.entries.partition_point(|cp| cp.at <= after);
        let end = self.entries.partition_point(|cp| cp.at <= until);
        &self.entries[start..end.max(start)]
    }

    /// Drop checkpoints that no longer affect any read at or after
    /// `cutoff`: everything older than the checkpoint governing `cutoff`.
    ///
    /// Returns the timestamp of the oldest retained checkpoint when
    /// anything was removed.
    pub fn prune_before(&mut self, cutoff: Timestamp) -> Option<Timestamp> {
        let governing = self.entries.partition_point(|cp| cp.at <= cutoff);
        if governing <= 1 {
            return None;
        }
        self.entries.drain(..governing - 1);
        self.entries.first().map(|cp| cp.at)
    }

    pub fn entries(&self) -> &[Checkpoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn log_of(points: &[(u64, u128)]) -> CheckpointLog {
        let mut log = CheckpointLog::new();
        for &(t, b) in points {
            log.append(ts(t), b).unwrap();
        }
        log
    }

    #[test]
    fn same_instant_collapses() {
        let mut log = CheckpointLog::new();
        assert_eq!(log.append(ts(10), 100).unwrap(), AppendOutcome::Appended);
        assert_eq!(log.append(ts(10), 250).unwrap(), AppendOutcome::Overwrote);
        assert_eq!(log.len(), 1);
        assert_eq!(log.current_balance(), 250);
    }

    #[test]
    fn rejects_backdated_append() {
        let mut log = log_of(&[(10, 100)]);
        let err = log.append(ts(9), 5).unwrap_err();
        assert!(matches!(err, StakingError::NonMonotonicTimestamp { .. }));
        assert_eq!(log.current_balance(), 100);
    }

    #[test]
    fn balance_at_between_checkpoints_uses_earlier() {
        let log = log_of(&[(10, 100), (20, 300), (30, 0)]);
        assert_eq!(log.balance_at(ts(0)), 0);
        assert_eq!(log.balance_at(ts(9)), 0);
        assert_eq!(log.balance_at(ts(10)), 100);
        assert_eq!(log.balance_at(ts(19)), 100);
        assert_eq!(log.balance_at(ts(25)), 300);
        assert_eq!(log.balance_at(ts(30)), 0);
        assert_eq!(log.balance_at(ts(1_000)), 0);
    }

    #[test]
    fn empty_log_reads_zero() {
        let log = CheckpointLog::new();
        assert_eq!(log.balance_at(ts(5)), 0);
        assert_eq!(log.current_balance(), 0);
        assert!(log.first().is_none());
    }

    #[test]
    fn between_is_half_open() {
        let log = log_of(&[(10, 1), (20, 2), (30, 3)]);
        let inner: Vec<u64> = log.between(ts(10), ts(30)).iter().map(|c| c.at.as_secs()).collect();
        assert_eq!(inner, vec![20, 30]);
        assert!(log.between(ts(30), ts(40)).is_empty());
    }

    #[test]
    fn prune_keeps_governing_checkpoint() {
        let mut log = log_of(&[(10, 1), (20, 2), (30, 3)]);
        assert_eq!(log.prune_before(ts(25)), Some(ts(20)));
        assert_eq!(log.len(), 2);
        assert_eq!(log.balance_at(ts(25)), 2);
        // Nothing older than the governing entry is left to drop.
        assert_eq!(log.prune_before(ts(25)), None);
    }

    #[test]
    fn from_entries_rejects_duplicates() {
        let entries = vec![Checkpoint::new(ts(5), 1), Checkpoint::new(ts(5), 2)];
        assert!(CheckpointLog::from_entries(entries).is_err());
    }
}
