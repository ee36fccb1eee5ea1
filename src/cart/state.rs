//! Cart state, command validation and event application.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{CheckedOut, ItemAdded, ItemQuantityAdjusted, ItemRemoved};
use super::{CartCommand, CartEvent, CartId, Summary};

/// Reasons a cart refuses a command. `Display` is the reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartRejection {
    #[error("Item was already added to this shopping cart")]
    DuplicateItem,

    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Item not found in shopping cart")]
    ItemNotFound,

    #[error("Cannot checkout empty shopping cart")]
    EmptyCart,

    #[error("Cannot add an item to a checked-out cart")]
    AddAfterCheckout,

    #[error("Cannot remove an item to a checked-out cart")]
    RemoveAfterCheckout,

    #[error("Cannot adjust item quantity in a checked-out cart")]
    AdjustAfterCheckout,

    #[error("Cannot checkout a checked-out cart")]
    AlreadyCheckedOut,
}

/// Current contents of one cart.
///
/// Open while `checkout_date` is `None`; checked out (terminal) once it is
/// set, after which `items` never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    items: BTreeMap<String, u32>,
    checkout_date: Option<DateTime<Utc>>,
}

impl CartState {
    pub fn items(&self) -> &BTreeMap<String, u32> {
        &self.items
    }

    pub fn checkout_date(&self) -> Option<DateTime<Utc>> {
        self.checkout_date
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.contains_key(item_id)
    }

    pub fn is_checked_out(&self) -> bool {
        self.checkout_date.is_some()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            items: self.items.clone(),
            checked_out: self.is_checked_out(),
            checkout_date: self.checkout_date,
        }
    }

    /// Decides which events `command` produces against this state.
    ///
    /// An empty vector means the command is accepted without changing
    /// anything (`Get`, or removing an item that is not in the cart).
    pub fn handle(
        &self,
        cart_id: &CartId,
        command: &CartCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<CartEvent>, CartRejection> {
        if self.is_checked_out() {
            return match command {
                CartCommand::AddItem { .. } => Err(CartRejection::AddAfterCheckout),
                CartCommand::RemoveItem { .. } => Err(CartRejection::RemoveAfterCheckout),
                CartCommand::AdjustItemQuantity { .. } => {
                    Err(CartRejection::AdjustAfterCheckout)
                }
                CartCommand::Checkout => Err(CartRejection::AlreadyCheckedOut),
                CartCommand::Get => Ok(Vec::new()),
            };
        }

        match command {
            CartCommand::AddItem { item_id, quantity } => {
                if self.has_item(item_id) {
                    return Err(CartRejection::DuplicateItem);
                }
                let quantity = positive(*quantity)?;
                Ok(vec![CartEvent::ItemAdded(ItemAdded {
                    cart_id: cart_id.clone(),
                    item_id: item_id.clone(),
                    quantity,
                    event_time: now,
                })])
            }
            CartCommand::RemoveItem { item_id } => {
                if !self.has_item(item_id) {
                    return Ok(Vec::new());
                }
                Ok(vec![CartEvent::ItemRemoved(ItemRemoved {
                    cart_id: cart_id.clone(),
                    item_id: item_id.clone(),
                    event_time: now,
                })])
            }
            CartCommand::AdjustItemQuantity { item_id, quantity } => {
                let new_quantity = positive(*quantity)?;
                if !self.has_item(item_id) {
                    return Err(CartRejection::ItemNotFound);
                }
                Ok(vec![CartEvent::ItemQuantityAdjusted(ItemQuantityAdjusted {
                    cart_id: cart_id.clone(),
                    item_id: item_id.clone(),
                    new_quantity,
                    event_time: now,
                })])
            }
            CartCommand::Checkout => {
                if self.is_empty() {
                    return Err(CartRejection::EmptyCart);
                }
                Ok(vec![CartEvent::CheckedOut(CheckedOut {
                    cart_id: cart_id.clone(),
                    event_time: now,
                })])
            }
            CartCommand::Get => Ok(Vec::new()),
        }
    }

    /// Folds one event into the state.
    pub fn apply(mut self, event: &CartEvent) -> Self {
        match event {
            CartEvent::ItemAdded(e) => self.set_quantity(&e.item_id, e.quantity),
            CartEvent::ItemRemoved(e) => {
                self.items.remove(&e.item_id);
            }
            CartEvent::ItemQuantityAdjusted(e) => self.set_quantity(&e.item_id, e.new_quantity),
            CartEvent::CheckedOut(e) => self.checkout_date = Some(e.event_time),
        }
        self
    }

    /// Replays events in log order on top of `self`.
    pub fn replay<'a>(self, events: impl IntoIterator<Item = &'a CartEvent>) -> Self {
        events.into_iter().fold(self, CartState::apply)
    }

    // Quantities in state stay strictly positive.
    fn set_quantity(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            self.items.remove(item_id);
        } else {
            self.items.insert(item_id.to_string(), quantity);
        }
    }
}

fn positive(quantity: i32) -> Result<u32, CartRejection> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(CartRejection::NonPositiveQuantity)
}
