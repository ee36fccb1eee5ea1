//! Rebuilding a topic from the tagged log.

use std::sync::Arc;

use futures::future;
use futures::stream::{BoxStream, StreamExt};

use super::{PublishError, TopicMapping, TopicMessage};
use crate::storage::{tagged_events, EventStore, Offset, StreamSettings};
use crate::tagging::Tag;

/// Messages of one topic and tag, in offset order.
///
/// The stream ends after yielding its first error. Resubscribe from the
/// offset of the last message received to carry on.
pub type TopicReplay<T> = BoxStream<'static, Result<Arc<TopicMessage<T>>, PublishError>>;

pub(crate) trait ReplaySource<T>: Send + Sync {
    fn replay(&self, tag: Tag, after: Offset) -> TopicReplay<T>;
}

pub(crate) struct LogReplay<M> {
    events: Arc<dyn EventStore>,
    mapping: Arc<M>,
    settings: StreamSettings,
}

impl<M> LogReplay<M> {
    pub(crate) fn new(events: Arc<dyn EventStore>, mapping: Arc<M>, settings: StreamSettings) -> Self {
        Self {
            events,
            mapping,
            settings,
        }
    }
}

impl<M: TopicMapping> ReplaySource<M::Message> for LogReplay<M> {
    fn replay(&self, tag: Tag, after: Offset) -> TopicReplay<M::Message> {
        let mapping = self.mapping.clone();

        tagged_events(self.events.clone(), tag, after, self.settings)
            .then(move |item| {
                let mapping = mapping.clone();
                async move {
                    let envelope = item?;
                    let message = mapping.translate(&envelope).await?.map(|payload| {
                        Arc::new(TopicMessage {
                            tag: envelope.tag,
                            offset: envelope.offset,
                            payload,
                        })
                    });
                    Ok::<_, PublishError>(message)
                }
            })
            .filter_map(|item| future::ready(item.transpose()))
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
            .boxed()
    }
}
