use crate::error::StateStoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod memory;
pub mod sled_store;

/// Last replication-key value persisted for a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub stream_id: String,
    #[serde(default)]
    pub replication_key: Option<String>,
    pub replication_key_value: JsonValue,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(
        stream_id: impl Into<String>,
        replication_key: Option<String>,
        replication_key_value: JsonValue,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            replication_key,
            replication_key_value,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<(), StateStoreError>;

    async fn load_bookmark(&self, stream_id: &str) -> Result<Option<Bookmark>, StateStoreError>;

    /// Returns whether a bookmark existed.
    async fn clear_bookmark(&self, stream_id: &str) -> Result<bool, StateStoreError>;

    async fn bookmarks(&self) -> Result<Vec<Bookmark>, StateStoreError>;

    /// The value an incremental extraction resumes from. A stored JSON
    /// `null` counts as no value.
    async fn get_starting_value(
        &self,
        stream_id: &str,
    ) -> Result<Option<JsonValue>, StateStoreError> {
        Ok(self
            .load_bookmark(stream_id)
            .await?
            .map(|b| b.replication_key_value)
            .filter(|v| !v.is_null()))
    }
}
