use connectors::sql::base::error::DbError;
use thiserror::Error;

/// Errors raised while turning records into sealed chunk files.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Reading the next row from the source failed.
    #[error("Source error: {0}")]
    Source(#[from] DbError),

    /// Opening, writing or closing a chunk file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Open/closed bookkeeping of the current chunk disagrees with itself.
    #[error("Inconsistent chunk state: {0}")]
    InconsistentState(String),
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to (de)serialize bookmark: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state document: {0}")]
    InvalidState(String),
}
