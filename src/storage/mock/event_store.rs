//! Mock EventStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::cart::{CartEvent, CartId};
use crate::storage::{EventEnvelope, EventStore, Offset, Result, StorageError};
use crate::tagging::Tag;

#[derive(Default)]
struct Log {
    entries: Vec<EventEnvelope>,
    highest: HashMap<CartId, u64>,
}

impl Log {
    fn push(
        &mut self,
        cart_id: &CartId,
        tag: &Tag,
        event_type: String,
        payload: serde_json::Value,
        created_at: chrono::DateTime<Utc>,
    ) -> EventEnvelope {
        let sequence_nr = self.highest.get(cart_id).copied().unwrap_or(0) + 1;
        let envelope = EventEnvelope {
            cart_id: cart_id.clone(),
            sequence_nr,
            tag: tag.clone(),
            offset: Offset::new(self.entries.len() as u64 + 1),
            event_type,
            payload,
            created_at,
        };
        self.highest.insert(cart_id.clone(), sequence_nr);
        self.entries.push(envelope.clone());
        envelope
    }
}

/// Mock event store that keeps the whole log in memory.
#[derive(Default)]
pub struct MockEventStore {
    log: RwLock<Log>,
    fail_on_append: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

impl MockEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Number of entries in the log.
    pub async fn len(&self) -> usize {
        self.log.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append an entry with an arbitrary type name and payload, bypassing
    /// event encoding. Simulates entries written by other producers.
    pub async fn append_raw(
        &self,
        cart_id: &CartId,
        tag: &Tag,
        event_type: &str,
        payload: serde_json::Value,
    ) -> EventEnvelope {
        self.log
            .write()
            .await
            .push(cart_id, tag, event_type.to_string(), payload, Utc::now())
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MockEventStore {
    async fn append(
        &self,
        cart_id: &CartId,
        tag: &Tag,
        expected_sequence_nr: u64,
        events: &[CartEvent],
    ) -> Result<Vec<EventEnvelope>> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Unavailable("mock append failure".to_string()));
        }
        if events.is_empty() {
            return Ok(Vec::new());
        }

        // Encode everything first so a bad event stores nothing.
        let encoded = events
            .iter()
            .map(|event| -> Result<_> {
                Ok((event.event_type(), event.to_payload()?, event.event_time()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut log = self.log.write().await;
        let next = log.highest.get(cart_id).copied().unwrap_or(0) + 1;
        if next != expected_sequence_nr {
            return Err(StorageError::SequenceConflict {
                cart_id: cart_id.clone(),
                expected: expected_sequence_nr,
                actual: next,
            });
        }

        Ok(encoded
            .into_iter()
            .map(|(event_type, payload, created_at)| {
                log.push(cart_id, tag, event_type.to_string(), payload, created_at)
            })
            .collect())
    }

    async fn load_from(
        &self,
        cart_id: &CartId,
        from_sequence_nr: u64,
    ) -> Result<Vec<EventEnvelope>> {
        self.check_read().await?;
        let log = self.log.read().await;
        Ok(log
            .entries
            .iter()
            .filter(|e| &e.cart_id == cart_id && e.sequence_nr >= from_sequence_nr)
            .cloned()
            .collect())
    }

    async fn highest_sequence_nr(&self, cart_id: &CartId) -> Result<u64> {
        self.check_read().await?;
        Ok(self.log.read().await.highest.get(cart_id).copied().unwrap_or(0))
    }

    async fn read_tagged(
        &self,
        tag: &Tag,
        after: Offset,
        limit: usize,
    ) -> Result<Vec<EventEnvelope>> {
        self.check_read().await?;
        let log = self.log.read().await;
        Ok(log
            .entries
            .iter()
            .filter(|e| &e.tag == tag && e.offset > after)
            .take(limit)
            .cloned()
            .collect())
    }
}
