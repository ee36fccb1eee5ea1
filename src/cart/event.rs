//! Events persisted to the cart log.
//!
//! The log stores the event type name next to a JSON payload holding the
//! event body. Keeping the name outside the payload lets readers tell an
//! unknown event apart from a malformed one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CartId;

pub const ITEM_ADDED: &str = "ItemAdded";
pub const ITEM_REMOVED: &str = "ItemRemoved";
pub const ITEM_QUANTITY_ADJUSTED: &str = "ItemQuantityAdjusted";
pub const CHECKED_OUT: &str = "CheckedOut";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub cart_id: CartId,
    pub item_id: String,
    pub quantity: u32,
    pub event_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub cart_id: CartId,
    pub item_id: String,
    pub event_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantityAdjusted {
    pub cart_id: CartId,
    pub item_id: String,
    pub new_quantity: u32,
    pub event_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedOut {
    pub cart_id: CartId,
    pub event_time: DateTime<Utc>,
}

/// Every fact a cart can record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded(ItemAdded),
    ItemRemoved(ItemRemoved),
    ItemQuantityAdjusted(ItemQuantityAdjusted),
    CheckedOut(CheckedOut),
}

/// Failure turning a stored payload back into a [`CartEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("Unknown event type: {0}")]
    UnknownType(String),

    #[error("Malformed {event_type} payload: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CartEvent {
    /// Type name stored alongside the payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => ITEM_ADDED,
            CartEvent::ItemRemoved(_) => ITEM_REMOVED,
            CartEvent::ItemQuantityAdjusted(_) => ITEM_QUANTITY_ADJUSTED,
            CartEvent::CheckedOut(_) => CHECKED_OUT,
        }
    }

    pub fn cart_id(&self) -> &CartId {
        match self {
            CartEvent::ItemAdded(e) => &e.cart_id,
            CartEvent::ItemRemoved(e) => &e.cart_id,
            CartEvent::ItemQuantityAdjusted(e) => &e.cart_id,
            CartEvent::CheckedOut(e) => &e.cart_id,
        }
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemAdded(e) => e.event_time,
            CartEvent::ItemRemoved(e) => e.event_time,
            CartEvent::ItemQuantityAdjusted(e) => e.event_time,
            CartEvent::CheckedOut(e) => e.event_time,
        }
    }

    /// Serializes the event body, without its type name.
    pub fn to_payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            CartEvent::ItemAdded(e) => serde_json::to_value(e),
            CartEvent::ItemRemoved(e) => serde_json::to_value(e),
            CartEvent::ItemQuantityAdjusted(e) => serde_json::to_value(e),
            CartEvent::CheckedOut(e) => serde_json::to_value(e),
        }
    }

    /// Rebuilds an event from its stored type name and payload.
    pub fn from_payload(
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Self, EventDecodeError> {
        let malformed = |source: serde_json::Error| EventDecodeError::Malformed {
            event_type: event_type.to_string(),
            source,
        };

        match event_type {
            ITEM_ADDED => serde_json::from_value(payload)
                .map(CartEvent::ItemAdded)
                .map_err(malformed),
            ITEM_REMOVED => serde_json::from_value(payload)
                .map(CartEvent::ItemRemoved)
                .map_err(malformed),
            ITEM_QUANTITY_ADJUSTED => serde_json::from_value(payload)
                .map(CartEvent::ItemQuantityAdjusted)
                .map_err(malformed),
            CHECKED_OUT => serde_json::from_value(payload)
                .map(CartEvent::CheckedOut)
                .map_err(malformed),
            other => Err(EventDecodeError::UnknownType(other.to_string())),
        }
    }
}
