//! Rolling-window time-weighted average balance.
//!
//! `avg(a, now) = ∫[now−W, now] balance_a(t) dt / W`
//!
//! The integral is taken piecewise across the checkpoints inside the
//! window; time before an account's first checkpoint counts as zero.
//! Accounts with less than one full window of history report zero so a
//! late, large stake cannot inflate its share of a distribution.

use serde::{Deserialize, Serialize};
use tally_types::Timestamp;

use crate::account::StakerAccount;
use crate::StakingError;

/// Which checkpoint the "at least one full window of history" rule is
/// measured from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAnchor {
    /// The account's very first checkpoint, ever.
    #[default]
    FirstCheckpoint,
    /// The earliest checkpoint inside the current window (falling back to
    /// the one governing the window start). Any balance change during the
    /// window zeroes the average.
    FirstInWindow,
}

/// Time-weighted average of `account`'s balance over `[now − window, now]`.
///
/// Returns `Ok(0)` when the anchor rule says there is not yet a full
/// window of history, or when `window_secs` is zero.
pub fn windowed_average(
    account: &StakerAccount,
    now: Timestamp,
    window_secs: u64,
    anchor: HistoryAnchor,
) -> Result<u128, StakingError> {
    if window_secs == 0 || account.history.is_empty() {
        return Ok(0);
    }
    let window_start = now.saturating_sub_secs(window_secs);
    let anchored_at = match anchor {
        HistoryAnchor::FirstCheckpoint => account.first_staked_at,
        HistoryAnchor::FirstInWindow => match account.history.between(window_start, now).first() {
            Some(cp) => cp.at,
            None => account
                .history
                .last()
                .map(|cp| cp.at)
                .unwrap_or(account.first_staked_at),
        },
    };
    if anchored_at.elapsed_since(now) < window_secs {
        return Ok(0);
    }
    // Compacted history cannot answer for time before the oldest kept
    // checkpoint; integrating across that gap would read zero.
    if let Some(horizon) = account.history_horizon {
        if window_start < horizon {
            return Err(StakingError::HistoryPruned {
                account: account.id.clone(),
                horizon,
            });
        }
    }

    let integral = integrate(account, window_start, now).ok_or(StakingError::Overflow)?;
    Ok(integral / u128::from(window_secs))
}

/// `∫[start, end] balance(t) dt` in balance-seconds.
fn integrate(account: &StakerAccount, start: Timestamp, end: Timestamp) -> Option<u128> {
    let mut total: u128 = 0;
    let mut cursor = start;
    let mut balance = account.history.balance_at(start);
    for cp in account.history.between(start, end) {
        let span = cursor.elapsed_since(cp.at);
        total = total.checked_add(balance.checked_mul(u128::from(span))?)?;
        cursor = cp.at;
        balance = cp.balance;
    }
    let tail = cursor.elapsed_since(end);
    total.checked_add(balance.checked_mul(u128::from(tail))?)
}
