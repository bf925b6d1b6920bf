//! Nullable infrastructure for deterministic testing.
//!
//! Everything the staking engine reaches outside itself for (time, the
//! value ledger holding custody, durable storage) has a test-friendly
//! stand-in here that:
//! - returns deterministic values
//! - can be steered programmatically, including injected failures
//! - never touches the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod store;

pub use clock::NullClock;
pub use ledger::NullValueLedger;
pub use store::NullStakingStore;
