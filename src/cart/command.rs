//! Commands accepted by a cart and the replies they produce.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request addressed to a single cart.
///
/// Quantities are signed so that zero and negative input reaches
/// validation instead of failing at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    AddItem { item_id: String, quantity: i32 },
    RemoveItem { item_id: String },
    AdjustItemQuantity { item_id: String, quantity: i32 },
    Checkout,
    Get,
}

impl CartCommand {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            CartCommand::AddItem { .. } => "AddItem",
            CartCommand::RemoveItem { .. } => "RemoveItem",
            CartCommand::AdjustItemQuantity { .. } => "AdjustItemQuantity",
            CartCommand::Checkout => "Checkout",
            CartCommand::Get => "Get",
        }
    }
}

/// Derived view of a cart returned with every accepted command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub items: BTreeMap<String, u32>,
    pub checked_out: bool,
    pub checkout_date: Option<DateTime<Utc>>,
}

/// Outcome of a command that reached its cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Accepted { summary: Summary },
    Rejected { reason: String },
}

impl Reply {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Reply::Accepted { .. })
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Reply::Accepted { summary } => Some(summary),
            Reply::Rejected { .. } => None,
        }
    }

    /// Converts into a `Result`, the rejection reason becoming the error.
    pub fn into_result(self) -> Result<Summary, String> {
        match self {
            Reply::Accepted { summary } => Ok(summary),
            Reply::Rejected { reason } => Err(reason),
        }
    }
}
