//! OffsetStore trait definition.

use async_trait::async_trait;

use super::{Offset, Result};
use crate::tagging::Tag;

/// Interface for consumer progress tracking.
///
/// Tracks the last fully handled log offset per consumer and tag, so a
/// restarted consumer resumes where it left off.
///
/// # Key
///
/// Offsets are keyed by `(consumer_id, tag)`:
/// - `consumer_id`: name of the projector or topic producer
/// - `tag`: the shard being consumed
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Last committed offset, `None` if the consumer never committed.
    async fn load(&self, consumer_id: &str, tag: &Tag) -> Result<Option<Offset>>;

    /// Commit an offset. Upserts.
    async fn save(&self, consumer_id: &str, tag: &Tag, offset: Offset) -> Result<()>;
}
