//! Cart service facade.
//!
//! Thin layer translating calls into cart commands and report queries,
//! with outcomes mapped onto request-level errors.

use std::sync::Arc;

use tracing::warn;

use crate::api::{ShoppingCartReportView, ShoppingCartView};
use crate::cart::{CartCommand, CartId, Reply};
use crate::entity::{CartRegistry, DispatchError};
use crate::storage::{CartReportRepository, StorageError};

/// Request-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The cart rejected the command.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The outcome is unknown; the command may have been applied.
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<DispatchError> for ServiceError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Timeout { .. } => ServiceError::Timeout(e.to_string()),
            other => ServiceError::Unavailable(other.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        ServiceError::Unavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Clone)]
pub struct CartService {
    registry: Arc<CartRegistry>,
    reports: Arc<dyn CartReportRepository>,
}

impl CartService {
    pub fn new(registry: Arc<CartRegistry>, reports: Arc<dyn CartReportRepository>) -> Self {
        Self { registry, reports }
    }

    pub async fn get(&self, cart_id: &CartId) -> Result<ShoppingCartView> {
        self.send(cart_id, CartCommand::Get).await
    }

    /// Report row for a cart. Lags behind the cart by however far the
    /// projection is behind.
    pub async fn get_report(&self, cart_id: &CartId) -> Result<ShoppingCartReportView> {
        self.reports
            .find_by_id(cart_id)
            .await?
            .map(ShoppingCartReportView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Couldn't find cart {}", cart_id)))
    }

    pub async fn add_item(
        &self,
        cart_id: &CartId,
        item_id: impl Into<String>,
        quantity: i32,
    ) -> Result<ShoppingCartView> {
        let command = CartCommand::AddItem {
            item_id: item_id.into(),
            quantity,
        };
        self.send(cart_id, command).await
    }

    pub async fn remove_item(
        &self,
        cart_id: &CartId,
        item_id: impl Into<String>,
    ) -> Result<ShoppingCartView> {
        let command = CartCommand::RemoveItem {
            item_id: item_id.into(),
        };
        self.send(cart_id, command).await
    }

    pub async fn adjust_item_quantity(
        &self,
        cart_id: &CartId,
        item_id: impl Into<String>,
        quantity: i32,
    ) -> Result<ShoppingCartView> {
        let command = CartCommand::AdjustItemQuantity {
            item_id: item_id.into(),
            quantity,
        };
        self.send(cart_id, command).await
    }

    pub async fn checkout(&self, cart_id: &CartId) -> Result<ShoppingCartView> {
        self.send(cart_id, CartCommand::Checkout).await
    }

    async fn send(&self, cart_id: &CartId, command: CartCommand) -> Result<ShoppingCartView> {
        let name = command.name();
        match self.registry.dispatch(cart_id, command).await {
            Ok(Reply::Accepted { summary }) => {
                Ok(ShoppingCartView::from_summary(cart_id.clone(), summary))
            }
            Ok(Reply::Rejected { reason }) => Err(ServiceError::BadRequest(reason)),
            Err(e) => {
                warn!(cart_id = %cart_id, command = name, error = %e, "dispatch failed");
                Err(e.into())
            }
        }
    }
}
