//! Lazy tagged event streams over an [`EventStore`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::trace;

use super::{EventEnvelope, EventStore, Offset, Result};
use crate::tagging::Tag;

/// Polling parameters for [`tagged_events`].
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub batch_size: usize,
    pub poll_interval: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(250),
        }
    }
}

struct Cursor {
    store: Arc<dyn EventStore>,
    tag: Tag,
    after: Offset,
    buffer: VecDeque<EventEnvelope>,
    caught_up: bool,
    settings: StreamSettings,
}

/// Every event carrying `tag` with an offset after `from`, in offset order.
///
/// The stream never ends: once it has caught up with the log it sleeps for
/// `poll_interval` between reads. A failed read yields an error item; the
/// stream may be polled again afterwards and retries from the same
/// position.
pub fn tagged_events(
    store: Arc<dyn EventStore>,
    tag: Tag,
    from: Offset,
    settings: StreamSettings,
) -> BoxStream<'static, Result<EventEnvelope>> {
    let cursor = Cursor {
        store,
        tag,
        after: from,
        buffer: VecDeque::new(),
        caught_up: false,
        settings,
    };

    stream::unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(envelope) = cursor.buffer.pop_front() {
                cursor.after = envelope.offset;
                return Some((Ok(envelope), cursor));
            }

            if cursor.caught_up {
                tokio::time::sleep(cursor.settings.poll_interval).await;
            }

            match cursor
                .store
                .read_tagged(&cursor.tag, cursor.after, cursor.settings.batch_size)
                .await
            {
                Ok(batch) => {
                    trace!(tag = %cursor.tag, after = %cursor.after, count = batch.len(), "polled");
                    cursor.caught_up = batch.len() < cursor.settings.batch_size;
                    cursor.buffer.extend(batch);
                }
                Err(e) => {
                    cursor.caught_up = true;
                    return Some((Err(e), cursor));
                }
            }
        }
    })
    .boxed()
}
