use crate::error::ConfigError;
use engine_core::batch::storage::StorageConfig;
use model::records::batch::{BatchEncoding, BatchFormat, Compression};
use serde::{Deserialize, Serialize};

/// `batch_config` section: how chunk files are encoded and where they go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    pub encoding: EncodingConfig,
    pub storage: StorageConfig,
}

/// Encoding as written by the operator; checked by [`EncodingConfig::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub format: String,
    pub compression: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            format: "jsonl".to_string(),
            compression: "gzip".to_string(),
        }
    }
}

impl EncodingConfig {
    pub fn resolve(&self) -> Result<BatchEncoding, ConfigError> {
        let format = match self.format.to_ascii_lowercase().as_str() {
            "jsonl" => Some(BatchFormat::Jsonl),
            _ => None,
        };
        let compression = match self.compression.to_ascii_lowercase().as_str() {
            "gzip" => Some(Compression::Gzip),
            _ => None,
        };

        match (format, compression) {
            (Some(format), Some(compression)) => Ok(BatchEncoding {
                format,
                compression,
            }),
            _ => Err(ConfigError::UnsupportedEncoding {
                format: self.format.clone(),
                compression: self.compression.clone(),
            }),
        }
    }
}
