//! Mock SnapshotStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cart::CartId;
use crate::storage::{Result, Snapshot, SnapshotStore, StorageError};

/// Mock snapshot store that keeps snapshots in memory.
#[derive(Default)]
pub struct MockSnapshotStore {
    snapshots: RwLock<HashMap<CartId, Vec<Snapshot>>>,
    fail_on_save: RwLock<bool>,
    fail_on_load: RwLock<bool>,
}

impl MockSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    pub async fn set_fail_on_load(&self, fail: bool) {
        *self.fail_on_load.write().await = fail;
    }

    /// Total snapshots held across all carts.
    pub async fn stored_count(&self) -> usize {
        self.snapshots.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SnapshotStore for MockSnapshotStore {
    async fn latest(&self, cart_id: &CartId) -> Result<Option<Snapshot>> {
        if *self.fail_on_load.read().await {
            return Err(StorageError::Unavailable("mock snapshot load failure".to_string()));
        }
        let store = self.snapshots.read().await;
        Ok(store.get(cart_id).and_then(|list| list.last().cloned()))
    }

    async fn save(&self, snapshot: &Snapshot, keep: usize) -> Result<()> {
        if *self.fail_on_save.read().await {
            return Err(StorageError::Unavailable("mock snapshot save failure".to_string()));
        }

        let mut store = self.snapshots.write().await;
        let list = store.entry(snapshot.cart_id.clone()).or_default();
        list.retain(|s| s.sequence_nr != snapshot.sequence_nr);
        list.push(snapshot.clone());
        list.sort_by_key(|s| s.sequence_nr);

        let excess = list.len().saturating_sub(keep);
        list.drain(..excess);
        Ok(())
    }

    async fn list(&self, cart_id: &CartId) -> Result<Vec<Snapshot>> {
        if *self.fail_on_load.read().await {
            return Err(StorageError::Unavailable("mock snapshot load failure".to_string()));
        }
        Ok(self
            .snapshots
            .read()
            .await
            .get(cart_id)
            .cloned()
            .unwrap_or_default())
    }
}
