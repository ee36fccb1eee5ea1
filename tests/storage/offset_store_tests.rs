//! OffsetStore interface tests.
//!
//! These tests verify the contract of the OffsetStore trait.
//! Each storage implementation should run these tests.

use cart_engine::storage::{Offset, OffsetStore};
use cart_engine::tagging::Tag;

// =============================================================================
// OffsetStore::load tests
// =============================================================================

pub async fn test_load_missing<S: OffsetStore>(store: &S) {
    let result = store
        .load("test_consumer", &Tag::new("test_missing"))
        .await
        .expect("load should succeed");
    assert!(result.is_none(), "missing offset should be None");
}

// =============================================================================
// OffsetStore::save tests
// =============================================================================

pub async fn test_save_and_load<S: OffsetStore>(store: &S) {
    let tag = Tag::new("test_save_load");

    store
        .save("test_consumer", &tag, Offset::new(42))
        .await
        .expect("save should succeed");

    let result = store.load("test_consumer", &tag).await.unwrap();
    assert_eq!(result, Some(Offset::new(42)));
}

pub async fn test_save_overwrites<S: OffsetStore>(store: &S) {
    let tag = Tag::new("test_overwrite");

    store.save("test_consumer", &tag, Offset::new(10)).await.unwrap();
    store.save("test_consumer", &tag, Offset::new(25)).await.unwrap();

    let result = store.load("test_consumer", &tag).await.unwrap();
    assert_eq!(result, Some(Offset::new(25)));
}

// =============================================================================
// Isolation tests
// =============================================================================

pub async fn test_consumer_isolation<S: OffsetStore>(store: &S) {
    let tag = Tag::new("test_iso_consumer");

    store.save("consumer_a", &tag, Offset::new(10)).await.unwrap();
    store.save("consumer_b", &tag, Offset::new(20)).await.unwrap();

    assert_eq!(store.load("consumer_a", &tag).await.unwrap(), Some(Offset::new(10)));
    assert_eq!(store.load("consumer_b", &tag).await.unwrap(), Some(Offset::new(20)));
}

pub async fn test_tag_isolation<S: OffsetStore>(store: &S) {
    let consumer = "test_iso_tag";

    store.save(consumer, &Tag::new("tag_x"), Offset::new(5)).await.unwrap();
    store.save(consumer, &Tag::new("tag_y"), Offset::new(15)).await.unwrap();

    assert_eq!(
        store.load(consumer, &Tag::new("tag_x")).await.unwrap(),
        Some(Offset::new(5))
    );
    assert_eq!(
        store.load(consumer, &Tag::new("tag_y")).await.unwrap(),
        Some(Offset::new(15))
    );
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all OffsetStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_offset_store_tests {
    ($store:expr) => {
        use $crate::storage::offset_store_tests::*;

        test_load_missing($store).await;
        println!("  test_load_missing: PASSED");

        test_save_and_load($store).await;
        println!("  test_save_and_load: PASSED");

        test_save_overwrites($store).await;
        println!("  test_save_overwrites: PASSED");

        test_consumer_isolation($store).await;
        println!("  test_consumer_isolation: PASSED");

        test_tag_isolation($store).await;
        println!("  test_tag_isolation: PASSED");
    };
}
