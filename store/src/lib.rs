//! Abstract storage traits for the tally staking ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! these traits. The rest of the codebase depends only on the traits.

pub mod account;
pub mod batch;
pub mod error;
pub mod globals;
pub mod staking;

pub use account::AccountRecord;
pub use batch::{BatchOp, WriteBatch};
pub use error::StoreError;
pub use globals::GlobalRecord;
pub use staking::StakingStore;
