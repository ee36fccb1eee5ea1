//! CartReportRepository trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::cart::CartId;

/// Read-side record of a cart's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartReport {
    pub cart_id: CartId,
    pub creation_date: DateTime<Utc>,
    pub checkout_date: Option<DateTime<Utc>>,
}

/// Outcome of [`CartReportRepository::record_checkout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutRecorded {
    Recorded,
    /// The record already had a checkout date; nothing changed.
    AlreadyRecorded,
    /// No record exists for the cart.
    MissingReport,
}

/// Interface for the cart report projection.
///
/// Every write is keyed and idempotent so re-delivered events leave the
/// table unchanged.
#[async_trait]
pub trait CartReportRepository: Send + Sync {
    async fn find_by_id(&self, cart_id: &CartId) -> Result<Option<CartReport>>;

    /// Create a record unless one exists. Returns `true` if created.
    async fn create_if_absent(&self, cart_id: &CartId, creation_date: DateTime<Utc>)
        -> Result<bool>;

    /// Set the checkout date of an existing record that has none.
    async fn record_checkout(
        &self,
        cart_id: &CartId,
        checkout_date: DateTime<Utc>,
    ) -> Result<CheckoutRecorded>;
}
