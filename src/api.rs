//! Externally visible message shapes.
//!
//! These types are what leaves the process, on topics or through the
//! service facade. They are kept apart from the persisted events so the
//! log format and the published format can evolve independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{CartEvent, CartId, Summary};
use crate::storage::CartReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCartItem {
    pub item_id: String,
    pub quantity: u32,
}

/// Full view of a cart, as published on the checkout topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCartView {
    pub id: CartId,
    pub items: Vec<ShoppingCartItem>,
    pub checked_out: bool,
    pub checkout_date: Option<DateTime<Utc>>,
}

impl ShoppingCartView {
    pub fn from_summary(id: CartId, summary: Summary) -> Self {
        Self {
            id,
            items: summary
                .items
                .into_iter()
                .map(|(item_id, quantity)| ShoppingCartItem { item_id, quantity })
                .collect(),
            checked_out: summary.checked_out,
            checkout_date: summary.checkout_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCartReportView {
    pub id: CartId,
    pub creation_date: DateTime<Utc>,
    pub checkout_date: Option<DateTime<Utc>>,
}

impl From<CartReport> for ShoppingCartReportView {
    fn from(report: CartReport) -> Self {
        Self {
            id: report.cart_id,
            creation_date: report.creation_date,
            checkout_date: report.checkout_date,
        }
    }
}

/// Cart events as published on the `shopping-cart-events` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PublishedCartEvent {
    ItemAdded {
        cart_id: CartId,
        item_id: String,
        quantity: u32,
        event_time: DateTime<Utc>,
    },
    ItemRemoved {
        cart_id: CartId,
        item_id: String,
        event_time: DateTime<Utc>,
    },
    ItemQuantityAdjusted {
        cart_id: CartId,
        item_id: String,
        new_quantity: u32,
        event_time: DateTime<Utc>,
    },
    CheckedOut {
        cart_id: CartId,
        event_time: DateTime<Utc>,
    },
}

impl PublishedCartEvent {
    pub fn cart_id(&self) -> &CartId {
        match self {
            PublishedCartEvent::ItemAdded { cart_id, .. }
            | PublishedCartEvent::ItemRemoved { cart_id, .. }
            | PublishedCartEvent::ItemQuantityAdjusted { cart_id, .. }
            | PublishedCartEvent::CheckedOut { cart_id, .. } => cart_id,
        }
    }
}

impl From<CartEvent> for PublishedCartEvent {
    fn from(event: CartEvent) -> Self {
        match event {
            CartEvent::ItemAdded(e) => PublishedCartEvent::ItemAdded {
                cart_id: e.cart_id,
                item_id: e.item_id,
                quantity: e.quantity,
                event_time: e.event_time,
            },
            CartEvent::ItemRemoved(e) => PublishedCartEvent::ItemRemoved {
                cart_id: e.cart_id,
                item_id: e.item_id,
                event_time: e.event_time,
            },
            CartEvent::ItemQuantityAdjusted(e) => PublishedCartEvent::ItemQuantityAdjusted {
                cart_id: e.cart_id,
                item_id: e.item_id,
                new_quantity: e.new_quantity,
                event_time: e.event_time,
            },
            CartEvent::CheckedOut(e) => PublishedCartEvent::CheckedOut {
                cart_id: e.cart_id,
                event_time: e.event_time,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::cart::ItemQuantityAdjusted;

    #[test]
    fn test_view_lists_items_in_id_order() {
        let summary = Summary {
            items: BTreeMap::from([("b".to_string(), 2), ("a".to_string(), 1)]),
            checked_out: false,
            checkout_date: None,
        };

        let view = ShoppingCartView::from_summary(CartId::new("c1"), summary);

        assert_eq!(
            view.items,
            vec![
                ShoppingCartItem {
                    item_id: "a".to_string(),
                    quantity: 1
                },
                ShoppingCartItem {
                    item_id: "b".to_string(),
                    quantity: 2
                },
            ]
        );
    }

    #[test]
    fn test_published_event_uses_kebab_case_type() {
        let time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let event: PublishedCartEvent = CartEvent::ItemQuantityAdjusted(ItemQuantityAdjusted {
            cart_id: CartId::new("c1"),
            item_id: "sku1".to_string(),
            new_quantity: 4,
            event_time: time,
        })
        .into();

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], json!("item-quantity-adjusted"));
        assert_eq!(value["cart_id"], json!("c1"));
        assert_eq!(value["new_quantity"], json!(4));
        assert_eq!(event.cart_id().as_str(), "c1");
    }
}
