//! Entity runtime.
//!
//! Each cart is owned by one actor task that processes its mailbox one
//! command at a time: validate against in-memory state, append to the log,
//! and only then apply and reply. Actors recover from the latest snapshot
//! plus the log suffix, snapshot periodically and stop when idle.

use std::time::Duration;

use crate::cart::CartId;
use crate::storage::StorageError;

mod actor;
mod registry;


pub use actor::CartHandle;
pub use registry::CartRegistry;

/// When to checkpoint cart state and how many checkpoints to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub every: u64,
    pub keep: usize,
}

impl SnapshotPolicy {
    /// Whether moving from `from` to `to` passes a multiple of `every`.
    pub fn crosses(&self, from: u64, to: u64) -> bool {
        self.every > 0 && to / self.every > from / self.every
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            every: 100,
            keep: 2,
        }
    }
}

/// Runtime parameters shared by all cart actors.
#[derive(Debug, Clone, Copy)]
pub struct EntitySettings {
    pub ask_timeout: Duration,
    pub snapshot: SnapshotPolicy,
    pub passivation_timeout: Duration,
    pub mailbox_capacity: usize,
}

impl Default for EntitySettings {
    fn default() -> Self {
        Self {
            ask_timeout: Duration::from_secs(5),
            snapshot: SnapshotPolicy::default(),
            passivation_timeout: Duration::from_secs(120),
            mailbox_capacity: 32,
        }
    }
}

/// Failures of a dispatch. A rejected command is not an error; it comes
/// back as `Reply::Rejected`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No reply within the ask timeout. The command may or may not have
    /// been applied.
    #[error("Dispatch to cart {cart_id} timed out after {after:?}")]
    Timeout { cart_id: CartId, after: Duration },

    /// The event append failed; the cart is unchanged.
    #[error("Failed to persist events: {0}")]
    Persistence(#[source] StorageError),

    /// The cart could not be rebuilt from its snapshot and log.
    #[error("Failed to recover cart state: {0}")]
    Recovery(#[source] StorageError),

    #[error("Cart {cart_id} stopped before replying")]
    EntityStopped { cart_id: CartId },
}

impl DispatchError {
    /// Whether the same dispatch may succeed on retry.
    ///
    /// A cart whose stored events or snapshot cannot be decoded fails the
    /// same way every time it recovers.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            DispatchError::Recovery(
                StorageError::InvalidData(_) | StorageError::Serialization(_)
            )
        )
    }
}
