//! Tagged consumer runtime.
//!
//! Runs one task per tag. Each task resumes from its committed offset,
//! streams the tagged log, hands every envelope to a [`TaggedHandler`] and
//! commits the envelope's offset once the handler succeeds. Delivery is
//! at-least-once: a crash between handling and committing replays the
//! envelope.
//!
//! A retryable failure restarts the shard from its last committed offset
//! after an exponential backoff. A fatal failure stops the shard and is
//! returned from its join handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

use crate::config::ReadSideConfig;
use crate::storage::{
    tagged_events, EventEnvelope, EventStore, Offset, OffsetStore, StreamSettings,
};
use crate::tagging::Tag;

#[cfg(test)]
mod tests;

/// Errors a handler can fail with.
pub trait HandlerError: std::error::Error + Send + Sync + 'static {
    /// Fatal errors stop the shard; everything else is retried.
    fn is_fatal(&self) -> bool;
}

/// Processes envelopes from the tagged log.
#[async_trait]
pub trait TaggedHandler: Send + Sync + 'static {
    type Error: HandlerError;

    /// Key under which offsets are committed.
    fn consumer_id(&self) -> &str;

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), Self::Error>;
}

/// Polling and restart parameters.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub stream: StreamSettings,
    pub backoff: ExponentialBuilder,
    /// Delay used once the backoff schedule is exhausted.
    pub max_backoff: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        ReadSideConfig::default().consumer_settings()
    }
}

/// A shard stopped on a fatal handler error.
#[derive(Debug, thiserror::Error)]
#[error("Consumer '{consumer_id}' stopped on {tag} at offset {offset}: {message}")]
pub struct ConsumerFailure {
    pub consumer_id: String,
    pub tag: Tag,
    pub offset: Offset,
    pub message: String,
}

/// Running shard tasks of one consumer. Dropping it stops the shards.
pub struct ConsumerHandle {
    consumer_id: String,
    cancel: watch::Sender<bool>,
    shards: Vec<(Tag, JoinHandle<Result<(), ConsumerFailure>>)>,
}

impl ConsumerHandle {
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.shards.iter().map(|(tag, _)| tag.clone()).collect()
    }

    /// Ask every shard to stop. Offsets stop advancing; an event being
    /// handled right now is finished first.
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    /// `true` once every shard task has exited.
    pub fn is_finished(&self) -> bool {
        self.shards.iter().all(|(_, task)| task.is_finished())
    }

    /// Wait for every shard task and collect their outcomes in tag order.
    pub async fn join(self) -> Vec<(Tag, Result<(), ConsumerFailure>)> {
        let mut outcomes = Vec::with_capacity(self.shards.len());
        for (tag, task) in self.shards {
            let outcome = match task.await {
                Ok(result) => result,
                Err(e) => Err(ConsumerFailure {
                    consumer_id: self.consumer_id.clone(),
                    tag: tag.clone(),
                    offset: Offset::NONE,
                    message: format!("shard task aborted: {}", e),
                }),
            };
            outcomes.push((tag, outcome));
        }
        outcomes
    }

    /// Stop every shard and wait for them.
    pub async fn shutdown(self) -> Vec<(Tag, Result<(), ConsumerFailure>)> {
        self.stop();
        self.join().await
    }
}

/// Start one consumer task per tag.
pub fn spawn_tagged_consumer<H: TaggedHandler>(
    handler: Arc<H>,
    events: Arc<dyn EventStore>,
    offsets: Arc<dyn OffsetStore>,
    tags: Vec<Tag>,
    settings: ConsumerSettings,
) -> ConsumerHandle {
    let consumer_id = handler.consumer_id().to_string();
    let (cancel, cancelled) = watch::channel(false);

    let shards = tags
        .into_iter()
        .map(|tag| {
            let shard = Shard {
                handler: handler.clone(),
                events: events.clone(),
                offsets: offsets.clone(),
                tag: tag.clone(),
                settings: settings.clone(),
                cancelled: cancelled.clone(),
            };
            let span = tracing::info_span!("consumer", consumer_id = %consumer_id, tag = %tag);
            (tag, tokio::spawn(shard.supervise().instrument(span)))
        })
        .collect();

    info!(consumer_id = %consumer_id, "consumer started");
    ConsumerHandle {
        consumer_id,
        cancel,
        shards,
    }
}

enum ShardExit {
    Cancelled,
    Retry {
        offset: Offset,
        progressed: bool,
        message: String,
    },
    Fatal {
        offset: Offset,
        message: String,
    },
}

struct Shard<H> {
    handler: Arc<H>,
    events: Arc<dyn EventStore>,
    offsets: Arc<dyn OffsetStore>,
    tag: Tag,
    settings: ConsumerSettings,
    cancelled: watch::Receiver<bool>,
}

impl<H: TaggedHandler> Shard<H> {
    async fn supervise(mut self) -> Result<(), ConsumerFailure> {
        let mut delays = self.settings.backoff.build();

        loop {
            match self.run().await {
                ShardExit::Cancelled => {
                    debug!("shard stopped");
                    return Ok(());
                }
                ShardExit::Fatal { offset, message } => {
                    error!(offset = %offset, error = %message, "shard stopped on fatal error");
                    return Err(ConsumerFailure {
                        consumer_id: self.handler.consumer_id().to_string(),
                        tag: self.tag.clone(),
                        offset,
                        message,
                    });
                }
                ShardExit::Retry {
                    offset,
                    progressed,
                    message,
                } => {
                    if progressed {
                        delays = self.settings.backoff.build();
                    }
                    let delay = delays.next().unwrap_or(self.settings.max_backoff);
                    error!(
                        offset = %offset,
                        error = %message,
                        ?delay,
                        "shard failed, restarting from last committed offset"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = wait_cancelled(&mut self.cancelled) => return Ok(()),
                    }
                }
            }
        }
    }

    /// Consume from the committed offset until cancelled or failed.
    async fn run(&mut self) -> ShardExit {
        let consumer_id = self.handler.consumer_id();

        let start = match self.offsets.load(consumer_id, &self.tag).await {
            Ok(offset) => offset.unwrap_or(Offset::NONE),
            Err(e) => {
                return ShardExit::Retry {
                    offset: Offset::NONE,
                    progressed: false,
                    message: format!("failed to load offset: {}", e),
                }
            }
        };
        debug!(offset = %start, "resuming");

        let mut stream = tagged_events(
            self.events.clone(),
            self.tag.clone(),
            start,
            self.settings.stream,
        );
        let mut committed = start;
        let mut progressed = false;

        loop {
            if *self.cancelled.borrow() {
                return ShardExit::Cancelled;
            }

            let next = tokio::select! {
                biased;
                _ = wait_cancelled(&mut self.cancelled) => return ShardExit::Cancelled,
                next = stream.next() => next,
            };

            let envelope = match next {
                Some(Ok(envelope)) => envelope,
                Some(Err(e)) => {
                    return ShardExit::Retry {
                        offset: committed,
                        progressed,
                        message: format!("failed to read events: {}", e),
                    }
                }
                None => return ShardExit::Cancelled,
            };

            if let Err(e) = self.handler.handle(&envelope).await {
                let message = e.to_string();
                return if e.is_fatal() {
                    ShardExit::Fatal {
                        offset: envelope.offset,
                        message,
                    }
                } else {
                    ShardExit::Retry {
                        offset: committed,
                        progressed,
                        message,
                    }
                };
            }

            if let Err(e) = self.offsets.save(consumer_id, &self.tag, envelope.offset).await {
                return ShardExit::Retry {
                    offset: committed,
                    progressed,
                    message: format!("failed to commit offset: {}", e),
                };
            }
            committed = envelope.offset;
            progressed = true;
        }
    }
}

/// Resolves once cancellation is requested or the sender is gone.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    loop {
        if *cancelled.borrow_and_update() {
            return;
        }
        if cancelled.changed().await.is_err() {
            return;
        }
    }
}
