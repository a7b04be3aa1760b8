use std::string::FromUtf8Error;
use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any MySQL driver error, including cursor read failures mid-stream.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// UTF-8 decoding failed on some byte data.
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// A column value could not be decoded into a native value.
    #[error("Failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// A starting value that cannot be bound as a query parameter.
    #[error("Unsupported parameter value: {0}")]
    UnsupportedParam(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),
}

/// Configuration problems detected before any query is executed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("Stream '{0}' has an empty SQL statement")]
    EmptySql(String),

    #[error("Stream '{0}' is INCREMENTAL but declares no replication_key")]
    MissingReplicationKey(String),

    #[error(
        "No value for replication key '{key}' of stream '{stream}'. INCREMENTAL sync not possible"
    )]
    NoStartingValue { stream: String, key: String },

    #[error(
        "Stream '{stream}' declares replication_key '{key}' but no replication_key_value_start. FULL_TABLE sync not possible"
    )]
    FullTableWithoutStart { stream: String, key: String },
}

/// Failure to start an extraction: either a configuration problem or the
/// query itself failed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Config(#[from] BindError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}
