use crate::error::ConfigError;
use batch::BatchConfig;
use connectors::sql::mysql::connector::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, num::NonZeroUsize, path::Path};
use stream::StreamConfig;
use tracing::debug;

pub mod batch;
pub mod stream;

pub const DEFAULT_BATCH_SIZE: u64 = 100_000;

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    pub streams: Vec<StreamConfig>,

    /// Records per chunk file.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    #[serde(default)]
    pub batch_config: Option<BatchConfig>,
}

impl TapConfig {
    /// Read, parse and validate a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;

        debug!("Loaded configuration from {}", path.display());
        Self::from_json(&source)
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: TapConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.batch_size()?;

        if let Some(batch) = &self.batch_config {
            batch.encoding.resolve()?;
            batch
                .storage
                .check_prefix()
                .map_err(|err| ConfigError::InvalidStorage(err.to_string()))?;
        }

        let mut seen = HashSet::new();
        for stream in &self.streams {
            stream.validate()?;
            if !seen.insert(stream.name.as_str()) {
                return Err(ConfigError::DuplicateStream(stream.name.clone()));
            }
        }

        Ok(())
    }

    pub fn batch_size(&self) -> Result<NonZeroUsize, ConfigError> {
        usize::try_from(self.batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::InvalidBatchSize(self.batch_size))
    }

    /// The batch settings in effect, falling back to jsonl+gzip files under
    /// the working directory.
    pub fn batch(&self) -> BatchConfig {
        self.batch_config.clone().unwrap_or_default()
    }
}
