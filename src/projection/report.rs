//! Projects cart events into `shopping_cart_report`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::ProjectionError;
use crate::cart::{CartEvent, CHECKED_OUT, ITEM_ADDED};
use crate::consumer::TaggedHandler;
use crate::storage::{CartReportRepository, CheckoutRecorded, EventEnvelope};

/// Offset key of the report projection.
pub const REPORT_PROCESSOR_ID: &str = "shopping-cart-report";

/// Keeps one report row per cart: created on the first `ItemAdded`,
/// stamped on `CheckedOut`. Every write is idempotent so redelivery is
/// harmless.
pub struct CartReportProcessor {
    reports: Arc<dyn CartReportRepository>,
}

impl CartReportProcessor {
    pub fn new(reports: Arc<dyn CartReportRepository>) -> Self {
        Self { reports }
    }

    async fn project(&self, event: CartEvent) -> Result<(), ProjectionError> {
        match event {
            CartEvent::ItemAdded(added) => {
                let created = self
                    .reports
                    .create_if_absent(&added.cart_id, added.event_time)
                    .await?;
                debug!(cart_id = %added.cart_id, created, "report row for ItemAdded");
                Ok(())
            }
            CartEvent::CheckedOut(checked_out) => {
                let outcome = self
                    .reports
                    .record_checkout(&checked_out.cart_id, checked_out.event_time)
                    .await?;
                match outcome {
                    CheckoutRecorded::Recorded => {
                        debug!(cart_id = %checked_out.cart_id, "checkout recorded");
                        Ok(())
                    }
                    CheckoutRecorded::AlreadyRecorded => {
                        debug!(cart_id = %checked_out.cart_id, "checkout already recorded");
                        Ok(())
                    }
                    CheckoutRecorded::MissingReport => {
                        warn!(cart_id = %checked_out.cart_id, "no report row for checkout");
                        Err(ProjectionError::Consistency {
                            cart_id: checked_out.cart_id,
                            event_type: CHECKED_OUT,
                        })
                    }
                }
            }
            CartEvent::ItemRemoved(_) | CartEvent::ItemQuantityAdjusted(_) => Ok(()),
        }
    }
}

#[async_trait]
impl TaggedHandler for CartReportProcessor {
    type Error = ProjectionError;

    fn consumer_id(&self) -> &str {
        REPORT_PROCESSOR_ID
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), ProjectionError> {
        // Only two event types touch the report; leave the rest undecoded.
        if envelope.event_type != ITEM_ADDED && envelope.event_type != CHECKED_OUT {
            return Ok(());
        }
        let event = envelope.decode()?;
        self.project(event).await
    }
}
