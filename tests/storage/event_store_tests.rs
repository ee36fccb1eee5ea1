//! EventStore interface tests.
//!
//! These tests verify the contract of the EventStore trait.
//! Each storage implementation should run these tests.

use chrono::{DateTime, TimeZone, Utc};

use cart_engine::cart::{CartEvent, CartId, CheckedOut, ItemAdded};
use cart_engine::storage::{EventStore, Offset, StorageError};
use cart_engine::tagging::Tag;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// An ItemAdded for `cart` with a fixed timestamp.
pub fn added(cart: &CartId, item: &str, quantity: u32) -> CartEvent {
    CartEvent::ItemAdded(ItemAdded {
        cart_id: cart.clone(),
        item_id: item.to_string(),
        quantity,
        event_time: at(quantity as i64),
    })
}

// =============================================================================
// EventStore::append tests
// =============================================================================

pub async fn test_append_single_event<S: EventStore>(store: &S) {
    let cart = CartId::new("test_append_single");
    let tag = Tag::new("test_tag_single");
    let event = added(&cart, "sku1", 3);

    let envelopes = store
        .append(&cart, &tag, 1, &[event.clone()])
        .await
        .expect("append should succeed");

    assert_eq!(envelopes.len(), 1);
    let envelope = &envelopes[0];
    assert_eq!(envelope.cart_id, cart);
    assert_eq!(envelope.sequence_nr, 1);
    assert_eq!(envelope.tag, tag);
    assert_eq!(envelope.event_type, "ItemAdded");
    assert!(envelope.offset > Offset::NONE);
    assert_eq!(envelope.decode().unwrap(), event);
}

pub async fn test_append_batch_is_sequential<S: EventStore>(store: &S) {
    let cart = CartId::new("test_append_batch");
    let tag = Tag::new("test_tag_batch");

    let batch = vec![added(&cart, "a", 1), added(&cart, "b", 2)];
    let first = store.append(&cart, &tag, 1, &batch).await.unwrap();
    let second = store
        .append(&cart, &tag, 3, &[added(&cart, "c", 3)])
        .await
        .unwrap();

    let sequences: Vec<u64> = first
        .iter()
        .chain(second.iter())
        .map(|e| e.sequence_nr)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert!(first[0].offset < first[1].offset);
    assert!(first[1].offset < second[0].offset);
    assert_eq!(store.highest_sequence_nr(&cart).await.unwrap(), 3);
}

pub async fn test_append_empty_batch<S: EventStore>(store: &S) {
    let cart = CartId::new("test_append_empty");
    let tag = Tag::new("test_tag_empty");

    let envelopes = store.append(&cart, &tag, 1, &[]).await.unwrap();

    assert!(envelopes.is_empty());
    assert_eq!(store.highest_sequence_nr(&cart).await.unwrap(), 0);
}

pub async fn test_append_sequence_conflict<S: EventStore>(store: &S) {
    let cart = CartId::new("test_append_conflict");
    let tag = Tag::new("test_tag_conflict");
    store
        .append(&cart, &tag, 1, &[added(&cart, "a", 1)])
        .await
        .unwrap();

    let result = store
        .append(&cart, &tag, 1, &[added(&cart, "b", 2), added(&cart, "c", 3)])
        .await;

    match result {
        Err(StorageError::SequenceConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected SequenceConflict, got {:?}", other),
    }
    // Nothing from the rejected batch landed.
    assert_eq!(store.highest_sequence_nr(&cart).await.unwrap(), 1);
    assert_eq!(store.load_from(&cart, 1).await.unwrap().len(), 1);
}

// =============================================================================
// EventStore::load_from tests
// =============================================================================

pub async fn test_load_from_returns_suffix<S: EventStore>(store: &S) {
    let cart = CartId::new("test_load_suffix");
    let tag = Tag::new("test_tag_suffix");
    let events: Vec<CartEvent> = (1..=5).map(|i| added(&cart, &format!("sku{}", i), i)).collect();
    store.append(&cart, &tag, 1, &events).await.unwrap();

    let all = store.load_from(&cart, 1).await.unwrap();
    let suffix = store.load_from(&cart, 4).await.unwrap();

    assert_eq!(all.len(), 5);
    let sequences: Vec<u64> = suffix.iter().map(|e| e.sequence_nr).collect();
    assert_eq!(sequences, vec![4, 5]);
    assert_eq!(suffix[0].decode().unwrap(), events[3]);
}

pub async fn test_load_unknown_cart<S: EventStore>(store: &S) {
    let cart = CartId::new("test_load_unknown");

    assert!(store.load_from(&cart, 1).await.unwrap().is_empty());
    assert_eq!(store.highest_sequence_nr(&cart).await.unwrap(), 0);
}

pub async fn test_carts_are_isolated<S: EventStore>(store: &S) {
    let a = CartId::new("test_isolation_a");
    let b = CartId::new("test_isolation_b");
    let tag = Tag::new("test_tag_isolation");

    store.append(&a, &tag, 1, &[added(&a, "x", 1)]).await.unwrap();
    store.append(&b, &tag, 1, &[added(&b, "y", 1)]).await.unwrap();
    store.append(&a, &tag, 2, &[added(&a, "z", 2)]).await.unwrap();

    assert_eq!(store.highest_sequence_nr(&a).await.unwrap(), 2);
    assert_eq!(store.highest_sequence_nr(&b).await.unwrap(), 1);
    assert!(store
        .load_from(&b, 1)
        .await
        .unwrap()
        .iter()
        .all(|e| e.cart_id == b));
}

// =============================================================================
// EventStore::read_tagged tests
// =============================================================================

pub async fn test_read_tagged_filters_and_orders<S: EventStore>(store: &S) {
    let tag = Tag::new("test_tag_read");
    let other = Tag::new("test_tag_read_other");
    let a = CartId::new("test_read_a");
    let b = CartId::new("test_read_b");
    let c = CartId::new("test_read_c");

    store.append(&a, &tag, 1, &[added(&a, "x", 1)]).await.unwrap();
    store.append(&c, &other, 1, &[added(&c, "x", 1)]).await.unwrap();
    store.append(&b, &tag, 1, &[added(&b, "x", 1)]).await.unwrap();
    store
        .append(
            &a,
            &tag,
            2,
            &[CartEvent::CheckedOut(CheckedOut {
                cart_id: a.clone(),
                event_time: at(10),
            })],
        )
        .await
        .unwrap();

    let tagged = store.read_tagged(&tag, Offset::NONE, 100).await.unwrap();

    let carts: Vec<&str> = tagged.iter().map(|e| e.cart_id.as_str()).collect();
    assert_eq!(carts, vec!["test_read_a", "test_read_b", "test_read_a"]);
    assert!(tagged.windows(2).all(|w| w[0].offset < w[1].offset));
    assert_eq!(tagged[2].event_type, "CheckedOut");
}

pub async fn test_read_tagged_after_and_limit<S: EventStore>(store: &S) {
    let tag = Tag::new("test_tag_paging");
    let cart = CartId::new("test_paging");
    let events: Vec<CartEvent> = (1..=5).map(|i| added(&cart, &format!("sku{}", i), i)).collect();
    let appended = store.append(&cart, &tag, 1, &events).await.unwrap();

    let page = store.read_tagged(&tag, appended[1].offset, 2).await.unwrap();

    let sequences: Vec<u64> = page.iter().map(|e| e.sequence_nr).collect();
    assert_eq!(sequences, vec![3, 4]);

    let rest = store.read_tagged(&tag, page[1].offset, 10).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert!(store
        .read_tagged(&tag, rest[0].offset, 10)
        .await
        .unwrap()
        .is_empty());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all EventStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_event_store_tests {
    ($store:expr) => {
        use $crate::storage::event_store_tests::*;

        // append tests
        test_append_single_event($store).await;
        println!("  test_append_single_event: PASSED");

        test_append_batch_is_sequential($store).await;
        println!("  test_append_batch_is_sequential: PASSED");

        test_append_empty_batch($store).await;
        println!("  test_append_empty_batch: PASSED");

        test_append_sequence_conflict($store).await;
        println!("  test_append_sequence_conflict: PASSED");

        // load tests
        test_load_from_returns_suffix($store).await;
        println!("  test_load_from_returns_suffix: PASSED");

        test_load_unknown_cart($store).await;
        println!("  test_load_unknown_cart: PASSED");

        test_carts_are_isolated($store).await;
        println!("  test_carts_are_isolated: PASSED");

        // tagged read tests
        test_read_tagged_filters_and_orders($store).await;
        println!("  test_read_tagged_filters_and_orders: PASSED");

        test_read_tagged_after_and_limit($store).await;
        println!("  test_read_tagged_after_and_limit: PASSED");
    };
}
