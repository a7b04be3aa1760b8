use crate::{
    error::StateStoreError,
    state::{Bookmark, StateStore},
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local bookmarks, optionally seeded from a JSON state document.
#[derive(Default)]
pub struct MemoryStateStore {
    bookmarks: RwLock<HashMap<String, Bookmark>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a document shaped like
    /// `{"bookmarks": {"<stream id>": {"replication_key_value": ...}}}`.
    pub fn from_state_json(state: &JsonValue) -> Result<Self, StateStoreError> {
        let Some(entries) = state.get("bookmarks") else {
            return Ok(Self::default());
        };
        let entries = entries.as_object().ok_or_else(|| {
            StateStoreError::InvalidState("'bookmarks' must be an object".to_string())
        })?;

        let mut bookmarks = HashMap::with_capacity(entries.len());
        for (stream_id, entry) in entries {
            let entry = entry.as_object().ok_or_else(|| {
                StateStoreError::InvalidState(format!("bookmark for '{stream_id}' must be an object"))
            })?;
            let replication_key = entry
                .get("replication_key")
                .and_then(JsonValue::as_str)
                .map(str::to_string);
            let value = entry
                .get("replication_key_value")
                .cloned()
                .unwrap_or(JsonValue::Null);

            bookmarks.insert(
                stream_id.clone(),
                Bookmark::new(stream_id.as_str(), replication_key, value),
            );
        }

        Ok(Self {
            bookmarks: RwLock::new(bookmarks),
        })
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<(), StateStoreError> {
        self.bookmarks
            .write()
            .await
            .insert(bookmark.stream_id.clone(), bookmark.clone());
        Ok(())
    }

    async fn load_bookmark(&self, stream_id: &str) -> Result<Option<Bookmark>, StateStoreError> {
        Ok(self.bookmarks.read().await.get(stream_id).cloned())
    }

    async fn clear_bookmark(&self, stream_id: &str) -> Result<bool, StateStoreError> {
        Ok(self.bookmarks.write().await.remove(stream_id).is_some())
    }

    async fn bookmarks(&self) -> Result<Vec<Bookmark>, StateStoreError> {
        let mut all: Vec<Bookmark> = self.bookmarks.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        Ok(all)
    }
}
