use model::error::SchemaError;
use thiserror::Error;

/// Errors raised while loading or validating configuration and catalogs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A stream definition is structurally unusable.
    #[error("Invalid stream '{stream}': {reason}")]
    InvalidStream { stream: String, reason: String },

    #[error("batch_size must be a positive integer, got {0}")]
    InvalidBatchSize(u64),

    /// Only `jsonl` + `gzip` batches can be produced.
    #[error("Unsupported batch encoding: format '{format}', compression '{compression}'")]
    UnsupportedEncoding { format: String, compression: String },

    #[error("Invalid storage settings: {0}")]
    InvalidStorage(String),

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Duplicate stream id '{0}'")]
    DuplicateStream(String),
}
