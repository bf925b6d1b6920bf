use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("malformed key or value: {0}")]
    Malformed(String),
}

impl From<LmdbError> for tally_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Serialization(e) => tally_store::StoreError::Serialization(e.to_string()),
            LmdbError::Malformed(msg) => tally_store::StoreError::Corruption(msg),
            other => tally_store::StoreError::Backend(other.to_string()),
        }
    }
}
