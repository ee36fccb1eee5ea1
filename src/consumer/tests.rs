use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use super::*;
use crate::cart::{CartEvent, CartId, ItemAdded};
use crate::config::ReadSideConfig;
use crate::storage::{MockEventStore, MockOffsetStore};

#[derive(Debug, thiserror::Error)]
#[error("test failure (fatal: {fatal})")]
struct TestError {
    fatal: bool,
}

impl HandlerError for TestError {
    fn is_fatal(&self) -> bool {
        self.fatal
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(Tag, Offset)>>,
    attempts: AtomicUsize,
    fail_first: usize,
    fatal_type: Option<&'static str>,
}

impl Recorder {
    fn seen(&self) -> Vec<(Tag, Offset)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaggedHandler for Recorder {
    type Error = TestError;

    fn consumer_id(&self) -> &str {
        "recorder"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), TestError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if Some(envelope.event_type.as_str()) == self.fatal_type {
            return Err(TestError { fatal: true });
        }
        if attempt < self.fail_first {
            return Err(TestError { fatal: false });
        }
        self.seen
            .lock()
            .unwrap()
            .push((envelope.tag.clone(), envelope.offset));
        Ok(())
    }
}

fn fast_settings() -> ConsumerSettings {
    ReadSideConfig {
        batch_size: 10,
        poll_interval_ms: 10,
        min_backoff_ms: 5,
        max_backoff_ms: 20,
        max_backoff_retries: 3,
        ..ReadSideConfig::default()
    }
    .consumer_settings()
}

async fn add_item(store: &MockEventStore, cart: &str, tag: &Tag, item: &str) {
    let cart_id = CartId::new(cart);
    let next = store.highest_sequence_nr(&cart_id).await.unwrap() + 1;
    let event = CartEvent::ItemAdded(ItemAdded {
        cart_id: cart_id.clone(),
        item_id: item.to_string(),
        quantity: 1,
        event_time: Utc::now(),
    });
    store.append(&cart_id, tag, next, &[event]).await.unwrap();
}

async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_consumes_each_tag_and_commits_offsets() {
    let events = Arc::new(MockEventStore::new());
    let offsets = Arc::new(MockOffsetStore::new());
    let (t0, t1) = (Tag::new("T0"), Tag::new("T1"));

    add_item(&events, "a", &t0, "x").await;
    add_item(&events, "b", &t1, "x").await;
    add_item(&events, "a", &t0, "y").await;

    let recorder = Arc::new(Recorder::default());
    let handle = spawn_tagged_consumer(
        recorder.clone(),
        events.clone(),
        offsets.clone(),
        vec![t0.clone(), t1.clone()],
        fast_settings(),
    );
    assert_eq!(handle.tags(), vec![t0.clone(), t1.clone()]);

    eventually(|| recorder.seen().len() == 3).await;
    let offsets_for_t0: Vec<Offset> = recorder
        .seen()
        .into_iter()
        .filter(|(tag, _)| tag == &t0)
        .map(|(_, offset)| offset)
        .collect();
    assert_eq!(offsets_for_t0, vec![Offset::new(1), Offset::new(3)]);

    let outcomes = handle.shutdown().await;
    assert!(outcomes.iter().all(|(_, outcome)| outcome.is_ok()));

    assert_eq!(offsets.load("recorder", &t0).await.unwrap(), Some(Offset::new(3)));
    assert_eq!(offsets.load("recorder", &t1).await.unwrap(), Some(Offset::new(2)));
}

#[tokio::test]
async fn test_restart_resumes_after_committed_offset() {
    let events = Arc::new(MockEventStore::new());
    let offsets = Arc::new(MockOffsetStore::new());
    let tag = Tag::new("T0");

    add_item(&events, "a", &tag, "x").await;
    add_item(&events, "a", &tag, "y").await;

    let first = Arc::new(Recorder::default());
    let handle = spawn_tagged_consumer(
        first.clone(),
        events.clone(),
        offsets.clone(),
        vec![tag.clone()],
        fast_settings(),
    );
    eventually(|| first.seen().len() == 2).await;
    handle.shutdown().await;

    add_item(&events, "a", &tag, "z").await;

    let second = Arc::new(Recorder::default());
    let handle = spawn_tagged_consumer(
        second.clone(),
        events.clone(),
        offsets.clone(),
        vec![tag.clone()],
        fast_settings(),
    );
    eventually(|| second.seen().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(second.seen(), vec![(tag.clone(), Offset::new(3))]);
    handle.shutdown().await;
}

#[tokio::test]
async fn test_retryable_failure_restarts_without_skipping() {
    let events = Arc::new(MockEventStore::new());
    let offsets = Arc::new(MockOffsetStore::new());
    let tag = Tag::new("T0");
    add_item(&events, "a", &tag, "x").await;

    let recorder = Arc::new(Recorder {
        fail_first: 2,
        ..Recorder::default()
    });
    let handle = spawn_tagged_consumer(
        recorder.clone(),
        events.clone(),
        offsets.clone(),
        vec![tag.clone()],
        fast_settings(),
    );

    eventually(|| recorder.seen().len() == 1).await;
    assert_eq!(recorder.attempts.load(Ordering::SeqCst), 3);
    assert!(!handle.is_finished());
    assert_eq!(offsets.load("recorder", &tag).await.unwrap(), Some(Offset::new(1)));
    handle.shutdown().await;
}

#[tokio::test]
async fn test_offset_commit_failure_redelivers() {
    let events = Arc::new(MockEventStore::new());
    let offsets = Arc::new(MockOffsetStore::new());
    let tag = Tag::new("T0");
    add_item(&events, "a", &tag, "x").await;

    offsets.set_fail_on_save(true).await;
    let recorder = Arc::new(Recorder::default());
    let handle = spawn_tagged_consumer(
        recorder.clone(),
        events.clone(),
        offsets.clone(),
        vec![tag.clone()],
        fast_settings(),
    );

    eventually(|| recorder.seen().len() >= 2).await;
    offsets.set_fail_on_save(false).await;
    eventually(|| recorder.seen().len() >= 3).await;
    handle.shutdown().await;

    // At-least-once: the same offset was handled more than once.
    assert!(recorder.seen().iter().all(|(_, offset)| *offset == Offset::new(1)));
    assert_eq!(offsets.load("recorder", &tag).await.unwrap(), Some(Offset::new(1)));
}

#[tokio::test]
async fn test_fatal_failure_stops_shard() {
    let events = Arc::new(MockEventStore::new());
    let offsets = Arc::new(MockOffsetStore::new());
    let tag = Tag::new("T0");
    add_item(&events, "a", &tag, "x").await;
    events
        .append_raw(&CartId::new("a"), &tag, "Poison", serde_json::json!({}))
        .await;
    add_item(&events, "a", &tag, "y").await;

    let recorder = Arc::new(Recorder {
        fatal_type: Some("Poison"),
        ..Recorder::default()
    });
    let handle = spawn_tagged_consumer(
        recorder.clone(),
        events.clone(),
        offsets.clone(),
        vec![tag.clone()],
        fast_settings(),
    );

    let outcomes = tokio::time::timeout(Duration::from_secs(2), handle.join())
        .await
        .unwrap();
    let (_, outcome) = &outcomes[0];
    let failure = outcome.as_ref().unwrap_err();
    assert_eq!(failure.consumer_id, "recorder");
    assert_eq!(failure.offset, Offset::new(2));

    assert_eq!(recorder.seen(), vec![(tag.clone(), Offset::new(1))]);
    assert_eq!(offsets.load("recorder", &tag).await.unwrap(), Some(Offset::new(1)));
}

#[tokio::test]
async fn test_stop_halts_offset_advancement() {
    let events = Arc::new(MockEventStore::new());
    let offsets = Arc::new(MockOffsetStore::new());
    let tag = Tag::new("T0");

    let recorder = Arc::new(Recorder::default());
    let handle = spawn_tagged_consumer(
        recorder.clone(),
        events.clone(),
        offsets.clone(),
        vec![tag.clone()],
        fast_settings(),
    );
    handle.stop();
    eventually(|| handle.is_finished()).await;

    add_item(&events, "a", &tag, "x").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(recorder.seen().is_empty());
    assert_eq!(offsets.load("recorder", &tag).await.unwrap(), None);
}
