//! Shopping-cart aggregate.
//!
//! The cart is a pure state machine: [`CartState::handle`] decides which
//! events a command produces, [`CartState::apply`] folds an event into the
//! state. Neither touches storage or the clock; the entity runtime supplies
//! both.

use std::fmt;

use serde::{Deserialize, Serialize};

mod command;
mod event;
mod state;


pub use command::{CartCommand, Reply, Summary};
pub use event::{
    CartEvent, CheckedOut, EventDecodeError, ItemAdded, ItemQuantityAdjusted, ItemRemoved,
    CHECKED_OUT, ITEM_ADDED, ITEM_QUANTITY_ADJUSTED, ITEM_REMOVED,
};
pub use state::{CartRejection, CartState};

/// Identifier of one shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CartId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CartId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for CartId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
