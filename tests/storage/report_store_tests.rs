//! CartReportRepository interface tests.
//!
//! These tests verify the contract of the CartReportRepository trait.
//! Each storage implementation should run these tests.

use chrono::{DateTime, TimeZone, Utc};

use cart_engine::cart::CartId;
use cart_engine::storage::{CartReportRepository, CheckoutRecorded};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub async fn test_find_missing<S: CartReportRepository>(store: &S) {
    let report = store
        .find_by_id(&CartId::new("test_report_missing"))
        .await
        .expect("find should succeed");
    assert!(report.is_none());
}

pub async fn test_create_if_absent_first_write_wins<S: CartReportRepository>(store: &S) {
    let cart = CartId::new("test_report_create");

    assert!(store.create_if_absent(&cart, at(0)).await.unwrap());
    assert!(!store.create_if_absent(&cart, at(30)).await.unwrap());

    let report = store.find_by_id(&cart).await.unwrap().unwrap();
    assert_eq!(report.cart_id, cart);
    assert_eq!(report.creation_date, at(0));
    assert_eq!(report.checkout_date, None);
}

pub async fn test_record_checkout_once<S: CartReportRepository>(store: &S) {
    let cart = CartId::new("test_report_checkout");
    store.create_if_absent(&cart, at(0)).await.unwrap();

    let first = store.record_checkout(&cart, at(60)).await.unwrap();
    let second = store.record_checkout(&cart, at(120)).await.unwrap();

    assert_eq!(first, CheckoutRecorded::Recorded);
    assert_eq!(second, CheckoutRecorded::AlreadyRecorded);
    let report = store.find_by_id(&cart).await.unwrap().unwrap();
    assert_eq!(report.creation_date, at(0));
    assert_eq!(report.checkout_date, Some(at(60)));
}

pub async fn test_record_checkout_missing<S: CartReportRepository>(store: &S) {
    let cart = CartId::new("test_report_orphan");

    let outcome = store.record_checkout(&cart, at(60)).await.unwrap();

    assert_eq!(outcome, CheckoutRecorded::MissingReport);
    assert!(store.find_by_id(&cart).await.unwrap().is_none());
}

/// Run all CartReportRepository interface tests against an implementation.
#[macro_export]
macro_rules! run_report_store_tests {
    ($store:expr) => {
        use $crate::storage::report_store_tests::*;

        test_find_missing($store).await;
        println!("  test_find_missing: PASSED");

        test_create_if_absent_first_write_wins($store).await;
        println!("  test_create_if_absent_first_write_wins: PASSED");

        test_record_checkout_once($store).await;
        println!("  test_record_checkout_once: PASSED");

        test_record_checkout_missing($store).await;
        println!("  test_record_checkout_missing: PASSED");
    };
}
