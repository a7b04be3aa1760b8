use connectors::sql::base::error::{ConnectorError, ExtractError};
use engine_config::error::ConfigError;
use engine_core::error::{BatchError, StateStoreError};
use thiserror::Error;

/// Top-level errors for a sync run. Any of these aborts the current stream.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding or executing the stream's statement failed.
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("Connection error: {0}")]
    Connector(#[from] ConnectorError),

    /// Writing a message to the output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
}
