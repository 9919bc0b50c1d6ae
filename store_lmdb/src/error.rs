use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbError> for tasknet_store::StoreError {
    fn from(e: LmdbError) -> Self {
        tasknet_store::StoreError::Backend(e.to_string())
    }
}
