use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored ledger is inconsistent: {0}")]
    Corruption(String),

    #[error("stored schema version {found}, this build reads {expected}")]
    SchemaMismatch { found: u32, expected: u32 },
}
