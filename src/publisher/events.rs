//! Republishes cart events in their external shape.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use super::{PublishError, Topic, TopicMapping, TopicProducer};
use crate::api::PublishedCartEvent;
use crate::cart::EventDecodeError;
use crate::storage::EventEnvelope;

/// Maps every cart event to its [`PublishedCartEvent`].
///
/// An entry whose type has no external mapping is an error, never a
/// skip: skipping would silently drop a message.
#[derive(Debug, Default)]
pub struct CartEventMapping;

#[async_trait]
impl TopicMapping for CartEventMapping {
    type Message = PublishedCartEvent;

    async fn translate(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<Option<PublishedCartEvent>, PublishError> {
        let event = envelope.decode().map_err(|e| match e {
            EventDecodeError::UnknownType(event_type) => {
                error!(
                    event_type = %event_type,
                    offset = %envelope.offset,
                    "no mapping for event type"
                );
                PublishError::UnknownEventMapping {
                    event_type,
                    offset: envelope.offset,
                }
            }
            other => PublishError::Decode(other),
        })?;

        Ok(Some(PublishedCartEvent::from(event)))
    }
}

/// Feeds the `shopping-cart-events` topic with every cart event.
pub type CartEventTopicProducer = TopicProducer<CartEventMapping>;

impl TopicProducer<CartEventMapping> {
    pub fn new(topic: Topic<PublishedCartEvent>) -> Self {
        Self::with_mapping(Arc::new(CartEventMapping), topic)
    }
}
