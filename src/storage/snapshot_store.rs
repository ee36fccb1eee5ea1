//! SnapshotStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::cart::{CartId, CartState};

/// Full cart state as of `sequence_nr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub cart_id: CartId,
    pub sequence_nr: u64,
    pub state: CartState,
    pub created_at: DateTime<Utc>,
}

/// Interface for cart state snapshots.
///
/// Snapshots bound replay cost; the event log stays the source of truth.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Newest snapshot of a cart, if any.
    async fn latest(&self, cart_id: &CartId) -> Result<Option<Snapshot>>;

    /// Store a snapshot, then drop all but the newest `keep` for that cart.
    ///
    /// Saving the same sequence number twice replaces the earlier state.
    async fn save(&self, snapshot: &Snapshot, keep: usize) -> Result<()>;

    /// All retained snapshots of a cart, oldest first.
    async fn list(&self, cart_id: &CartId) -> Result<Vec<Snapshot>>;
}
