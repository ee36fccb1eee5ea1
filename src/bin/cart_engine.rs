//! cart-engine: shopping cart engine host
//!
//! Runs the cart registry, the report projection and both topic producers
//! in one process, logging every message published on the topics.
//!
//! ## Configuration
//! ```yaml
//! storage:
//!   type: sqlite
//!   sqlite:
//!     path: ./data/cart-engine.db
//!
//! tagging:
//!   shards: 4
//!
//! entity:
//!   snapshot_every: 100
//!   keep_snapshots: 2
//! ```
//!
//! The config file path may be passed as the first argument.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

use cart_engine::config::Config;
use cart_engine::publisher::TopicMessage;
use cart_engine::storage::init_storage;
use cart_engine::utils::bootstrap::init_tracing;
use cart_engine::CartEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;
    init_tracing(config.logging.json);

    info!("Starting cart-engine");

    let stores = init_storage(&config.storage).await?;
    let engine = CartEngine::new(stores, &config)?;

    let loggers = vec![
        log_topic(
            engine.checkout_topic().name().to_string(),
            engine.checkout_topic().subscribe(),
        ),
        log_topic(
            engine.events_topic().name().to_string(),
            engine.events_topic().subscribe(),
        ),
    ];
    let consumers = engine.start_all();

    info!("cart-engine running, press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    for consumer in consumers {
        let consumer_id = consumer.consumer_id().to_string();
        for (tag, outcome) in consumer.shutdown().await {
            if let Err(e) = outcome {
                error!(consumer_id = %consumer_id, tag = %tag, error = %e, "consumer had failed");
            }
        }
    }
    for logger in loggers {
        logger.abort();
    }

    Ok(())
}

fn log_topic<T: Serialize + Send + Sync + 'static>(
    topic: String,
    rx: broadcast::Receiver<Arc<TopicMessage<T>>>,
) -> JoinHandle<()> {
    let mut messages = BroadcastStream::new(rx);
    tokio::spawn(async move {
        while let Some(next) = messages.next().await {
            match next {
                Ok(message) => {
                    let payload = serde_json::to_string(&message.payload)
                        .unwrap_or_else(|e| format!("<unserializable: {}>", e));
                    info!(
                        topic = %topic,
                        tag = %message.tag,
                        offset = %message.offset,
                        payload = %payload,
                        "published"
                    );
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "topic logger lagged");
                }
            }
        }
    })
}
