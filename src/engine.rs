//! Wires the stores, the cart registry, the read side and the topic
//! producers together.

use std::sync::Arc;

use tracing::info;

use crate::api::{PublishedCartEvent, ShoppingCartView};
use crate::config::{Config, ConfigError};
use crate::consumer::{spawn_tagged_consumer, ConsumerHandle, ConsumerSettings};
use crate::entity::CartRegistry;
use crate::projection::CartReportProcessor;
use crate::publisher::{
    CartEventMapping, CheckoutViewMapping, Topic, TopicProducer, CART_EVENTS_TOPIC,
    CHECKOUT_TOPIC,
};
use crate::service::CartService;
use crate::storage::Stores;
use crate::tagging::Tag;

/// A running cart engine.
pub struct CartEngine {
    stores: Stores,
    registry: Arc<CartRegistry>,
    consumer_settings: ConsumerSettings,
    checkout_mapping: Arc<CheckoutViewMapping>,
    checkout_topic: Topic<ShoppingCartView>,
    event_mapping: Arc<CartEventMapping>,
    events_topic: Topic<PublishedCartEvent>,
}

impl CartEngine {
    pub fn new(stores: Stores, config: &Config) -> Result<Self, ConfigError> {
        let tagger = config
            .tagging
            .tagger()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let registry = Arc::new(CartRegistry::new(
            stores.events.clone(),
            stores.snapshots.clone(),
            tagger,
            config.entity.settings(),
        ));

        let consumer_settings = config.read_side.consumer_settings();
        let capacity = config.read_side.topic_capacity;

        let checkout_mapping = Arc::new(CheckoutViewMapping::new(registry.clone()));
        let checkout_topic = Topic::new(CHECKOUT_TOPIC, capacity).with_replay(
            stores.events.clone(),
            checkout_mapping.clone(),
            consumer_settings.stream,
        );
        let event_mapping = Arc::new(CartEventMapping);
        let events_topic = Topic::new(CART_EVENTS_TOPIC, capacity).with_replay(
            stores.events.clone(),
            event_mapping.clone(),
            consumer_settings.stream,
        );

        Ok(Self {
            stores,
            registry,
            consumer_settings,
            checkout_mapping,
            checkout_topic,
            event_mapping,
            events_topic,
        })
    }

    pub fn registry(&self) -> &Arc<CartRegistry> {
        &self.registry
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn service(&self) -> CartService {
        CartService::new(self.registry.clone(), self.stores.reports.clone())
    }

    /// Live views on checkout. Late or restarted subscribers catch up
    /// with [`Topic::subscribe_from`].
    pub fn checkout_topic(&self) -> &Topic<ShoppingCartView> {
        &self.checkout_topic
    }

    pub fn events_topic(&self) -> &Topic<PublishedCartEvent> {
        &self.events_topic
    }

    fn tags(&self) -> Vec<Tag> {
        self.registry.tagger().all_tags()
    }

    /// Start the report projection on every tag.
    pub fn start_read_side(&self) -> ConsumerHandle {
        let processor = CartReportProcessor::new(self.stores.reports.clone());
        self.spawn(Arc::new(processor))
    }

    /// Start the `shopping-cart` checkout producer on every tag.
    pub fn start_checkout_publisher(&self) -> ConsumerHandle {
        let producer =
            TopicProducer::with_mapping(self.checkout_mapping.clone(), self.checkout_topic.clone());
        self.spawn(Arc::new(producer))
    }

    /// Start the `shopping-cart-events` producer on every tag.
    pub fn start_event_publisher(&self) -> ConsumerHandle {
        let producer =
            TopicProducer::with_mapping(self.event_mapping.clone(), self.events_topic.clone());
        self.spawn(Arc::new(producer))
    }

    /// Start the projection and both producers.
    pub fn start_all(&self) -> Vec<ConsumerHandle> {
        let handles = vec![
            self.start_read_side(),
            self.start_checkout_publisher(),
            self.start_event_publisher(),
        ];
        info!(
            consumers = handles.len(),
            shards = self.registry.tagger().shards(),
            "read side started"
        );
        handles
    }

    fn spawn<H: crate::consumer::TaggedHandler>(&self, handler: Arc<H>) -> ConsumerHandle {
        spawn_tagged_consumer(
            handler,
            self.stores.events.clone(),
            self.stores.offsets.clone(),
            self.tags(),
            self.consumer_settings.clone(),
        )
    }
}
