//! Topic publishers.
//!
//! Producers tail the tagged log and publish external messages onto
//! in-process broadcast topics. Offsets are committed per topic and tag
//! after each publish, so a restarted producer resumes where it stopped
//! and may republish the last message.
//!
//! The broadcast only reaches subscribers attached at publish time. The
//! log stays the record of every topic: a subscriber that attaches late,
//! lags or restarts calls [`Topic::subscribe_from`] with the last offset
//! it saw and receives every message after it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::cart::{CartId, EventDecodeError};
use crate::consumer::{HandlerError, TaggedHandler};
use crate::entity::DispatchError;
use crate::storage::{EventEnvelope, EventStore, Offset, StorageError, StreamSettings};
use crate::tagging::Tag;

mod checkout;
mod events;
mod replay;


pub use checkout::{CheckoutTopicProducer, CheckoutViewMapping};
pub use events::{CartEventMapping, CartEventTopicProducer};
pub use replay::TopicReplay;

use replay::{LogReplay, ReplaySource};

/// Topic carrying full cart views on checkout.
pub const CHECKOUT_TOPIC: &str = "shopping-cart";
/// Topic carrying translated cart events.
pub const CART_EVENTS_TOPIC: &str = "shopping-cart-events";

/// A published message with the log position it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage<T> {
    pub tag: Tag,
    pub offset: Offset,
    pub payload: T,
}

/// In-process broadcast topic, optionally backed by the log for replay.
pub struct Topic<T> {
    name: String,
    sender: broadcast::Sender<Arc<TopicMessage<T>>>,
    replay: Option<Arc<dyn ReplaySource<T>>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
            replay: self.replay.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Topic<T> {
    /// A live-only topic. `capacity` is how far a subscriber may fall
    /// behind before it lags.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            name: name.into(),
            sender,
            replay: None,
        }
    }

    /// Back the topic with the log, translating entries with `mapping`.
    pub fn with_replay<M>(
        mut self,
        events: Arc<dyn EventStore>,
        mapping: Arc<M>,
        settings: StreamSettings,
    ) -> Self
    where
        M: TopicMapping<Message = T>,
    {
        self.replay = Some(Arc::new(LogReplay::new(events, mapping, settings)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish to current subscribers. Returns how many received it; zero
    /// subscribers is not an error.
    pub fn publish(&self, message: TopicMessage<T>) -> usize {
        let offset = message.offset;
        match self.sender.send(Arc::new(message)) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(topic = %self.name, offset = %offset, "no subscribers");
                0
            }
        }
    }

    /// Messages published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TopicMessage<T>>> {
        self.sender.subscribe()
    }

    /// Every message on `tag` after `after`, rebuilt from the log, then
    /// new ones as they are appended. `None` for a live-only topic.
    ///
    /// Pass [`Offset::NONE`] to start from the beginning, or the offset of
    /// the last message handled to resume.
    pub fn subscribe_from(&self, tag: Tag, after: Offset) -> Option<TopicReplay<T>> {
        self.replay
            .as_ref()
            .map(|source| source.replay(tag, after))
    }
}

/// Translates log entries into the messages of one topic.
#[async_trait]
pub trait TopicMapping: Send + Sync + 'static {
    type Message: Send + Sync + 'static;

    /// `Ok(None)` when the entry has no message on this topic.
    async fn translate(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<Option<Self::Message>, PublishError>;
}

/// Tagged consumer that publishes the mapped form of each entry.
pub struct TopicProducer<M: TopicMapping> {
    mapping: Arc<M>,
    topic: Topic<M::Message>,
    consumer_id: String,
}

impl<M: TopicMapping> TopicProducer<M> {
    pub fn with_mapping(mapping: Arc<M>, topic: Topic<M::Message>) -> Self {
        let consumer_id = consumer_id_for(topic.name());
        Self {
            mapping,
            topic,
            consumer_id,
        }
    }

    pub fn topic(&self) -> &Topic<M::Message> {
        &self.topic
    }
}

#[async_trait]
impl<M: TopicMapping> TaggedHandler for TopicProducer<M> {
    type Error = PublishError;

    fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    #[instrument(skip_all, fields(topic = %self.topic.name(), cart_id = %envelope.cart_id, offset = %envelope.offset))]
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        let Some(payload) = self.mapping.translate(envelope).await? else {
            return Ok(());
        };

        let receivers = self.topic.publish(TopicMessage {
            tag: envelope.tag.clone(),
            offset: envelope.offset,
            payload,
        });
        debug!(receivers, "published");
        Ok(())
    }
}

/// Errors raised while publishing an event.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The log holds an event type this producer cannot translate.
    #[error("No topic mapping for event type '{event_type}' at offset {offset}")]
    UnknownEventMapping { event_type: String, offset: Offset },

    #[error("Failed to fetch cart view: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Cart {cart_id} rejected view request: {reason}")]
    Rejected { cart_id: CartId, reason: String },

    #[error("Publisher storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to decode event: {0}")]
    Decode(#[from] EventDecodeError),
}

impl HandlerError for PublishError {
    fn is_fatal(&self) -> bool {
        match self {
            PublishError::UnknownEventMapping { .. }
            | PublishError::Rejected { .. }
            | PublishError::Decode(_) => true,
            PublishError::Dispatch(e) => !e.is_transient(),
            PublishError::Storage(_) => false,
        }
    }
}

fn consumer_id_for(topic: &str) -> String {
    format!("topic:{}", topic)
}
