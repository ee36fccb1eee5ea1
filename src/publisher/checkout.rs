//! Publishes the full cart view whenever a cart checks out.

use std::sync::Arc;

use async_trait::async_trait;

use super::{PublishError, Topic, TopicMapping, TopicProducer};
use crate::api::ShoppingCartView;
use crate::cart::{CartCommand, Reply, CHECKED_OUT};
use crate::entity::CartRegistry;
use crate::storage::EventEnvelope;

/// Maps `CheckedOut` entries to the cart's view.
///
/// The view is read from the cart itself at publish time, so it reflects
/// the cart's current state rather than the state at the event's offset.
/// For a checked-out cart the two are the same.
pub struct CheckoutViewMapping {
    registry: Arc<CartRegistry>,
}

impl CheckoutViewMapping {
    pub fn new(registry: Arc<CartRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl TopicMapping for CheckoutViewMapping {
    type Message = ShoppingCartView;

    async fn translate(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<Option<ShoppingCartView>, PublishError> {
        if envelope.event_type != CHECKED_OUT {
            return Ok(None);
        }

        match self.registry.dispatch(&envelope.cart_id, CartCommand::Get).await? {
            Reply::Accepted { summary } => Ok(Some(ShoppingCartView::from_summary(
                envelope.cart_id.clone(),
                summary,
            ))),
            Reply::Rejected { reason } => Err(PublishError::Rejected {
                cart_id: envelope.cart_id.clone(),
                reason,
            }),
        }
    }
}

/// Feeds the `shopping-cart` topic.
pub type CheckoutTopicProducer = TopicProducer<CheckoutViewMapping>;

impl TopicProducer<CheckoutViewMapping> {
    pub fn new(registry: Arc<CartRegistry>, topic: Topic<ShoppingCartView>) -> Self {
        Self::with_mapping(Arc::new(CheckoutViewMapping::new(registry)), topic)
    }
}
