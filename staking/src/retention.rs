//! Checkpoint compaction.
//!
//! Averages and validity only ever look one rolling window back, so
//! checkpoints older than the retention horizon can go, except for the
//! one still governing the horizon itself. Point-in-time reads before the
//! oldest retained checkpoint then fail with
//! [`StakingError::HistoryPruned`] instead of answering wrongly, and so
//! does an average whose window is later widened past that checkpoint.

use tally_store::{BatchOp, StakingStore, WriteBatch};
use tally_types::Timestamp;

use crate::custody::ValueLedger;
use crate::engine::StakingEngine;
use crate::state::StakingState;
use crate::StakingError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactionReport {
    pub cutoff: Timestamp,
    /// Accounts that lost at least one checkpoint.
    pub accounts: usize,
    pub removed: usize,
}

impl StakingState {
    /// Apply the configured retention policy as of `now`. A no-op while
    /// retention is disabled.
    pub fn compact<S: StakingStore>(&mut self, store: &S, now: Timestamp) -> Result<CompactionReport, StakingError> {
        if !self.config.retention.enabled {
            tracing::debug!("retention disabled, skipping compaction");
            return Ok(CompactionReport::default());
        }
        let horizon = self.config.retention_horizon_secs(self.globals.rolling_window_secs);
        self.compact_into(store, now, horizon)
    }

    /// Prune every account's history older than `now − horizon_secs`
    /// (never less than one rolling window) and persist the result.
    pub fn compact_into<S: StakingStore>(
        &mut self,
        store: &S,
        now: Timestamp,
        horizon_secs: u64,
    ) -> Result<CompactionReport, StakingError> {
        let cutoff = now.saturating_sub_secs(horizon_secs.max(self.globals.rolling_window_secs));
        let mut report = CompactionReport {
            cutoff,
            ..Default::default()
        };

        let mut staged = Vec::new();
        let mut batch = WriteBatch::new();
        for account in self.accounts.values() {
            let mut account = account.clone();
            let before = account.history.len();
            let Some(oldest) = account.history.prune_before(cutoff) else {
                continue;
            };
            report.removed += before - account.history.len();
            account.history_horizon = Some(oldest);
            batch.push(BatchOp::PruneCheckpoints {
                account: account.id.clone(),
                before: oldest,
            });
            batch.put_account(account.record());
            staged.push(account);
        }
        report.accounts = staged.len();
        if staged.is_empty() {
            return Ok(report);
        }

        store.commit(batch)?;
        let globals = self.globals.clone();
        self.install(staged, globals);
        tracing::info!(
            cutoff = %cutoff,
            accounts = report.accounts,
            removed = report.removed,
            "compacted checkpoint history"
        );
        Ok(report)
    }
}

impl<S: StakingStore, L: ValueLedger> StakingEngine<S, L> {
    /// See [`StakingState::compact`].
    pub fn compact(&mut self, now: Timestamp) -> Result<CompactionReport, StakingError> {
        self.state.compact(&self.store, now)
    }
}
