//! LMDB storage backend for the tally staking ledger.
//!
//! Implements [`tally_store::StakingStore`] using the `heed` LMDB bindings.
//! Globals, account records, checkpoint logs and the blacklist each map to
//! one LMDB database within a single environment.

pub mod environment;
pub mod error;
pub mod store;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use store::LmdbStakingStore;
