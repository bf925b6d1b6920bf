//! Fundamental types for the tally staking ledger.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: account identities, timestamps and balance checkpoints.

pub mod account;
pub mod checkpoint;
pub mod time;

pub use account::AccountId;
pub use checkpoint::Checkpoint;
pub use time::Timestamp;
