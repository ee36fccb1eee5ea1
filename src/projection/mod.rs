//! Read-side projection of cart lifecycles into the report table.

use crate::cart::{CartId, EventDecodeError};
use crate::consumer::HandlerError;
use crate::storage::StorageError;

mod report;


pub use report::{CartReportProcessor, REPORT_PROCESSOR_ID};

/// Errors raised while projecting an event.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The event refers to a record that should already exist.
    #[error("Didn't find cart for checkout. CartID: {cart_id}")]
    Consistency {
        cart_id: CartId,
        event_type: &'static str,
    },

    #[error("Projection storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to decode event: {0}")]
    Decode(#[from] EventDecodeError),
}

impl HandlerError for ProjectionError {
    /// A payload that cannot be decoded never will be; everything else may
    /// succeed on redelivery.
    fn is_fatal(&self) -> bool {
        matches!(self, ProjectionError::Decode(_))
    }
}
