//! Time-weighted staking ledger.
//!
//! Stakers lock value in custody on an external [`ValueLedger`]. Every
//! balance change is recorded as a timestamped checkpoint, from which the
//! ledger derives:
//! - a maturity clock, running while the balance is at or above the
//!   minimum stake, that makes an account valid after one rolling window
//! - a time-weighted average balance over the rolling window
//! - a reward share proportional to that average when the admin
//!   distributes the undistributed reward pool
//!
//! Credited reward is claimed separately and never touches the stake.
//! All state lives in one [`StakingState`] persisted through a
//! [`tally_store::StakingStore`]; each mutation commits as one batch.

pub mod account;
pub mod accounting;
pub mod admin;
pub mod average;
pub mod checkpoint;
pub mod claims;
pub mod config;
pub mod custody;
pub mod engine;
pub mod error;
pub mod math;
pub mod retention;
pub mod rewards;
pub mod shared;
pub mod state;

pub use account::{MaturityState, StakerAccount};
pub use average::{windowed_average, HistoryAnchor};
pub use checkpoint::{AppendOutcome, CheckpointLog};
pub use config::{LoggingConfig, RetentionConfig, StakingConfig};
pub use custody::{TransferError, ValueLedger};
pub use engine::StakingEngine;
pub use error::StakingError;
pub use retention::CompactionReport;
pub use rewards::{DistributionReport, RemainderPolicy};
pub use shared::SharedEngine;
pub use state::{InvariantViolation, LedgerSummary, StakingState};
