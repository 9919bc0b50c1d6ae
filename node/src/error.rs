use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] tasknet_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] tasknet_store::StoreError),

    #[error("lmdb error: {0}")]
    Lmdb(#[from] tasknet_store_lmdb::LmdbError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mutating call made from inside another mutating call")]
    Reentrant,

    #[error("ledger lock poisoned")]
    Poisoned,

    #[error("ledger halted: in-memory state could not be restored after a failed commit")]
    Halted,
}
