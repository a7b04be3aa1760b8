use connectors::sql::base::error::{ConnectorError, DbError};
use engine_config::error::ConfigError;
use engine_core::error::StateStoreError;
use engine_runtime::error::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to sync: {0}")]
    Sync(#[from] SyncError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("No bookmark stored for stream '{0}'")]
    NoBookmark(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
