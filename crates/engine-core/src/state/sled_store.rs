use crate::{
    error::StateStoreError,
    state::{Bookmark, StateStore},
};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

const BOOKMARK_PREFIX: &str = "bookmark:";

/// Bookmarks persisted in an embedded sled database, one JSON document per
/// stream.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn key(stream_id: &str) -> String {
        format!("{BOOKMARK_PREFIX}{stream_id}")
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<(), StateStoreError> {
        let bytes = serde_json::to_vec(bookmark)?;
        self.db.insert(Self::key(&bookmark.stream_id), bytes)?;
        self.db.flush_async().await?;

        debug!(
            "Saved bookmark for '{}': {}",
            bookmark.stream_id, bookmark.replication_key_value
        );
        Ok(())
    }

    async fn load_bookmark(&self, stream_id: &str) -> Result<Option<Bookmark>, StateStoreError> {
        match self.db.get(Self::key(stream_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn clear_bookmark(&self, stream_id: &str) -> Result<bool, StateStoreError> {
        let removed = self.db.remove(Self::key(stream_id))?.is_some();
        self.db.flush_async().await?;
        Ok(removed)
    }

    async fn bookmarks(&self) -> Result<Vec<Bookmark>, StateStoreError> {
        let mut bookmarks = Vec::new();
        for item in self.db.scan_prefix(BOOKMARK_PREFIX) {
            let (_key, value) = item?;
            bookmarks.push(serde_json::from_slice(&value)?);
        }
        Ok(bookmarks)
    }
}
