//! Mock CartReportRepository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::cart::CartId;
use crate::storage::{CartReport, CartReportRepository, CheckoutRecorded, Result, StorageError};

/// Mock report repository that keeps records in memory.
#[derive(Default)]
pub struct MockCartReportRepository {
    reports: RwLock<HashMap<CartId, CartReport>>,
    fail_on_write: RwLock<bool>,
}

impl MockCartReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn count(&self) -> usize {
        self.reports.read().await.len()
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("mock report write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartReportRepository for MockCartReportRepository {
    async fn find_by_id(&self, cart_id: &CartId) -> Result<Option<CartReport>> {
        Ok(self.reports.read().await.get(cart_id).cloned())
    }

    async fn create_if_absent(
        &self,
        cart_id: &CartId,
        creation_date: DateTime<Utc>,
    ) -> Result<bool> {
        self.check_write().await?;
        let mut reports = self.reports.write().await;
        if reports.contains_key(cart_id) {
            return Ok(false);
        }
        reports.insert(
            cart_id.clone(),
            CartReport {
                cart_id: cart_id.clone(),
                creation_date,
                checkout_date: None,
            },
        );
        Ok(true)
    }

    async fn record_checkout(
        &self,
        cart_id: &CartId,
        checkout_date: DateTime<Utc>,
    ) -> Result<CheckoutRecorded> {
        self.check_write().await?;
        let mut reports = self.reports.write().await;
        match reports.get_mut(cart_id) {
            None => Ok(CheckoutRecorded::MissingReport),
            Some(report) if report.checkout_date.is_some() => Ok(CheckoutRecorded::AlreadyRecorded),
            Some(report) => {
                report.checkout_date = Some(checkout_date);
                Ok(CheckoutRecorded::Recorded)
            }
        }
    }
}
