//! SnapshotStore interface tests.
//!
//! These tests verify the contract of the SnapshotStore trait.
//! Each storage implementation should run these tests.

use chrono::{TimeZone, Utc};

use cart_engine::cart::{CartEvent, CartId, CartState, ItemAdded};
use cart_engine::storage::{Snapshot, SnapshotStore};

/// Snapshot of `cart` holding `items` items, taken at `sequence_nr`.
pub fn make_snapshot(cart: &CartId, sequence_nr: u64, items: u32) -> Snapshot {
    let time = Utc.timestamp_opt(1_700_000_000 + sequence_nr as i64, 0).unwrap();
    let events: Vec<CartEvent> = (1..=items)
        .map(|i| {
            CartEvent::ItemAdded(ItemAdded {
                cart_id: cart.clone(),
                item_id: format!("sku{}", i),
                quantity: i,
                event_time: time,
            })
        })
        .collect();

    Snapshot {
        cart_id: cart.clone(),
        sequence_nr,
        state: CartState::default().replay(&events),
        created_at: time,
    }
}

// =============================================================================
// SnapshotStore::latest tests
// =============================================================================

pub async fn test_latest_missing<S: SnapshotStore>(store: &S) {
    let cart = CartId::new("test_snap_missing");

    let latest = store.latest(&cart).await.expect("latest should succeed");

    assert!(latest.is_none());
    assert!(store.list(&cart).await.unwrap().is_empty());
}

pub async fn test_save_and_latest<S: SnapshotStore>(store: &S) {
    let cart = CartId::new("test_snap_save");
    let snapshot = make_snapshot(&cart, 100, 3);

    store.save(&snapshot, 2).await.expect("save should succeed");

    let latest = store.latest(&cart).await.unwrap().expect("snapshot should exist");
    assert_eq!(latest, snapshot);
}

pub async fn test_latest_is_highest_sequence<S: SnapshotStore>(store: &S) {
    let cart = CartId::new("test_snap_highest");

    store.save(&make_snapshot(&cart, 200, 2), 5).await.unwrap();
    store.save(&make_snapshot(&cart, 100, 1), 5).await.unwrap();

    let latest = store.latest(&cart).await.unwrap().unwrap();
    assert_eq!(latest.sequence_nr, 200);
    assert_eq!(latest.state.items().len(), 2);
}

// =============================================================================
// Retention tests
// =============================================================================

pub async fn test_save_prunes_to_keep<S: SnapshotStore>(store: &S) {
    let cart = CartId::new("test_snap_prune");

    for (i, sequence_nr) in [100, 200, 300, 400].into_iter().enumerate() {
        store
            .save(&make_snapshot(&cart, sequence_nr, i as u32 + 1), 2)
            .await
            .unwrap();
    }

    let retained: Vec<u64> = store
        .list(&cart)
        .await
        .unwrap()
        .iter()
        .map(|s| s.sequence_nr)
        .collect();
    assert_eq!(retained, vec![300, 400]);
}

pub async fn test_save_same_sequence_replaces<S: SnapshotStore>(store: &S) {
    let cart = CartId::new("test_snap_replace");

    store.save(&make_snapshot(&cart, 100, 1), 2).await.unwrap();
    store.save(&make_snapshot(&cart, 100, 4), 2).await.unwrap();

    let all = store.list(&cart).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].state.items().len(), 4);
}

pub async fn test_checked_out_state_survives<S: SnapshotStore>(store: &S) {
    let cart = CartId::new("test_snap_checked_out");
    let mut snapshot = make_snapshot(&cart, 100, 2);
    let checkout_time = Utc.timestamp_opt(1_800_000_000, 123_456_789).unwrap();
    snapshot.state = snapshot
        .state
        .apply(&CartEvent::CheckedOut(cart_engine::cart::CheckedOut {
            cart_id: cart.clone(),
            event_time: checkout_time,
        }));

    store.save(&snapshot, 2).await.unwrap();

    let latest = store.latest(&cart).await.unwrap().unwrap();
    assert_eq!(latest.state.checkout_date(), Some(checkout_time));
    assert_eq!(latest.state, snapshot.state);
}

pub async fn test_carts_are_isolated<S: SnapshotStore>(store: &S) {
    let a = CartId::new("test_snap_iso_a");
    let b = CartId::new("test_snap_iso_b");

    store.save(&make_snapshot(&a, 100, 1), 1).await.unwrap();
    store.save(&make_snapshot(&b, 300, 3), 1).await.unwrap();

    assert_eq!(store.latest(&a).await.unwrap().unwrap().sequence_nr, 100);
    assert_eq!(store.latest(&b).await.unwrap().unwrap().sequence_nr, 300);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all SnapshotStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_snapshot_store_tests {
    ($store:expr) => {
        use $crate::storage::snapshot_store_tests::*;

        test_latest_missing($store).await;
        println!("  test_latest_missing: PASSED");

        test_save_and_latest($store).await;
        println!("  test_save_and_latest: PASSED");

        test_latest_is_highest_sequence($store).await;
        println!("  test_latest_is_highest_sequence: PASSED");

        test_save_prunes_to_keep($store).await;
        println!("  test_save_prunes_to_keep: PASSED");

        test_save_same_sequence_replaces($store).await;
        println!("  test_save_same_sequence_replaces: PASSED");

        test_checked_out_state_survives($store).await;
        println!("  test_checked_out_state_survives: PASSED");

        test_carts_are_isolated($store).await;
        println!("  test_carts_are_isolated: PASSED");
    };
}
