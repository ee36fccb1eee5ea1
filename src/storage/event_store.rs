//! EventStore trait definition.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Result;
use crate::cart::{CartEvent, CartId, EventDecodeError};
use crate::tagging::Tag;

/// Position of an entry in the global event log.
///
/// Offsets start at 1 and grow with commit order. `Offset::NONE` sits
/// before the first entry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Offset(u64);

impl Offset {
    pub const NONE: Offset = Offset(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted event with its log coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub cart_id: CartId,
    /// Per-cart sequence number, starting at 1.
    pub sequence_nr: u64,
    pub tag: Tag,
    pub offset: Offset,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn decode(&self) -> std::result::Result<CartEvent, EventDecodeError> {
        CartEvent::from_payload(&self.event_type, self.payload.clone())
    }
}

/// Interface for the cart event log.
///
/// Implementations:
/// - `SqliteEventStore`: SQLite storage
/// - `MockEventStore`: In-memory storage
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append events for a cart.
    ///
    /// `expected_sequence_nr` is the sequence number the first event must
    /// receive. Fails with `SequenceConflict` when the log disagrees. Either
    /// every event is stored or none is.
    async fn append(
        &self,
        cart_id: &CartId,
        tag: &Tag,
        expected_sequence_nr: u64,
        events: &[CartEvent],
    ) -> Result<Vec<EventEnvelope>>;

    /// Events of a cart with `sequence_nr >= from_sequence_nr`, in order.
    async fn load_from(&self, cart_id: &CartId, from_sequence_nr: u64)
        -> Result<Vec<EventEnvelope>>;

    /// Highest stored sequence number of a cart, 0 when it has none.
    async fn highest_sequence_nr(&self, cart_id: &CartId) -> Result<u64>;

    /// Up to `limit` events carrying `tag` with an offset after `after`,
    /// in offset order.
    async fn read_tagged(&self, tag: &Tag, after: Offset, limit: usize)
        -> Result<Vec<EventEnvelope>>;
}
