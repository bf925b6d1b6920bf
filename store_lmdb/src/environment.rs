//! LMDB environment setup.

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;

use crate::LmdbError;

/// Default map size: 1 GiB of address space, grown lazily by the OS.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    /// `b"globals"` → bincode([`tally_store::GlobalRecord`])
    pub(crate) globals_db: Database<Bytes, Bytes>,
    /// account id → bincode([`tally_store::AccountRecord`])
    pub(crate) accounts_db: Database<Bytes, Bytes>,
    /// `len(id) ‖ id ‖ timestamp_be` → balance_be
    pub(crate) checkpoints_db: Database<Bytes, Bytes>,
    /// account id → empty
    pub(crate) blacklist_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment directory is owned by this process; the
        // same path must not be opened twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let globals_db = env.create_database(&mut wtxn, Some("globals"))?;
        let accounts_db = env.create_database(&mut wtxn, Some("accounts"))?;
        let checkpoints_db = env.create_database(&mut wtxn, Some("checkpoints"))?;
        let blacklist_db = env.create_database(&mut wtxn, Some("blacklist"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            globals_db,
            accounts_db,
            checkpoints_db,
            blacklist_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}
