//! Mock OffsetStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{Offset, OffsetStore, Result, StorageError};
use crate::tagging::Tag;

/// Mock offset store that keeps offsets in memory.
#[derive(Default)]
pub struct MockOffsetStore {
    offsets: RwLock<HashMap<(String, Tag), Offset>>,
    fail_on_save: RwLock<bool>,
}

impl MockOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }
}

#[async_trait]
impl OffsetStore for MockOffsetStore {
    async fn load(&self, consumer_id: &str, tag: &Tag) -> Result<Option<Offset>> {
        let key = (consumer_id.to_string(), tag.clone());
        Ok(self.offsets.read().await.get(&key).copied())
    }

    async fn save(&self, consumer_id: &str, tag: &Tag, offset: Offset) -> Result<()> {
        if *self.fail_on_save.read().await {
            return Err(StorageError::Unavailable("mock offset save failure".to_string()));
        }
        let key = (consumer_id.to_string(), tag.clone());
        self.offsets.write().await.insert(key, offset);
        Ok(())
    }
}
