//! Entity runtime, tagging, read-side and logging configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::consumer::ConsumerSettings;
use crate::entity::{EntitySettings, SnapshotPolicy};
use crate::storage::StreamSettings;
use crate::tagging::{ShardTagger, TaggingError, DEFAULT_SHARDS, DEFAULT_TAG_PREFIX};
use crate::utils::retry::read_side_backoff;

/// Entity runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// How long a dispatch waits for its reply.
    pub ask_timeout_ms: u64,
    /// Snapshot after this many events.
    pub snapshot_every: u64,
    /// Snapshots retained per cart.
    pub keep_snapshots: usize,
    /// Idle time after which a cart actor stops.
    pub passivation_timeout_secs: u64,
    /// Commands queued per cart before senders wait.
    pub mailbox_capacity: usize,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            ask_timeout_ms: 5000,
            snapshot_every: 100,
            keep_snapshots: 2,
            passivation_timeout_secs: 120,
            mailbox_capacity: 32,
        }
    }
}

impl EntityConfig {
    pub fn settings(&self) -> EntitySettings {
        EntitySettings {
            ask_timeout: Duration::from_millis(self.ask_timeout_ms),
            snapshot: SnapshotPolicy {
                every: self.snapshot_every,
                keep: self.keep_snapshots,
            },
            passivation_timeout: Duration::from_secs(self.passivation_timeout_secs),
            mailbox_capacity: self.mailbox_capacity,
        }
    }
}

/// Shard tagging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    pub shards: u32,
    pub tag_prefix: String,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }
}

impl TaggingConfig {
    pub fn tagger(&self) -> Result<ShardTagger, TaggingError> {
        ShardTagger::new(self.tag_prefix.clone(), self.shards)
    }
}

/// Read-side consumer configuration, shared by the projector and the
/// topic producers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadSideConfig {
    /// Events fetched per poll.
    pub batch_size: usize,
    /// Sleep between polls once caught up.
    pub poll_interval_ms: u64,
    /// First restart delay after a failure.
    pub min_backoff_ms: u64,
    /// Upper bound on the restart delay.
    pub max_backoff_ms: u64,
    /// Restarts before the delay stays at its maximum.
    pub max_backoff_retries: usize,
    /// Messages a live topic subscriber may fall behind before it lags.
    pub topic_capacity: usize,
}

impl Default for ReadSideConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval_ms: 250,
            min_backoff_ms: 100,
            max_backoff_ms: 10_000,
            max_backoff_retries: 10,
            topic_capacity: 1024,
        }
    }
}

impl ReadSideConfig {
    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            stream: StreamSettings {
                batch_size: self.batch_size,
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
            backoff: read_side_backoff(self),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}
