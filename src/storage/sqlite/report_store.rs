//! SQLite CartReportRepository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::cart::CartId;
use crate::storage::schema::{Reports, CREATE_REPORTS_TABLE};
use crate::storage::{CartReport, CartReportRepository, CheckoutRecorded, Result};

/// SQLite implementation of CartReportRepository.
pub struct SqliteCartReportRepository {
    pool: SqlitePool,
}

impl SqliteCartReportRepository {
    /// Create a new SQLite report repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the report table if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_REPORTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CartReportRepository for SqliteCartReportRepository {
    async fn find_by_id(&self, cart_id: &CartId) -> Result<Option<CartReport>> {
        let query = Query::select()
            .columns([Reports::CreationDate, Reports::CheckoutDate])
            .from(Reports::Table)
            .and_where(Expr::col(Reports::CartId).eq(cart_id.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let creation_date: String = row.try_get("creation_date")?;
        let checkout_date: Option<String> = row.try_get("checkout_date")?;

        Ok(Some(CartReport {
            cart_id: cart_id.clone(),
            creation_date: parse_timestamp(&creation_date)?,
            checkout_date: checkout_date.as_deref().map(parse_timestamp).transpose()?,
        }))
    }

    async fn create_if_absent(
        &self,
        cart_id: &CartId,
        creation_date: DateTime<Utc>,
    ) -> Result<bool> {
        let query = Query::insert()
            .into_table(Reports::Table)
            .columns([Reports::CartId, Reports::CreationDate, Reports::CheckoutDate])
            .values_panic([
                cart_id.as_str().into(),
                format_timestamp(&creation_date).into(),
                Option::<String>::None.into(),
            ])
            .on_conflict(OnConflict::column(Reports::CartId).do_nothing().to_owned())
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_checkout(
        &self,
        cart_id: &CartId,
        checkout_date: DateTime<Utc>,
    ) -> Result<CheckoutRecorded> {
        let query = Query::update()
            .table(Reports::Table)
            .value(Reports::CheckoutDate, format_timestamp(&checkout_date))
            .and_where(Expr::col(Reports::CartId).eq(cart_id.as_str()))
            .and_where(Expr::col(Reports::CheckoutDate).is_null())
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        if result.rows_affected() == 1 {
            return Ok(CheckoutRecorded::Recorded);
        }

        match self.find_by_id(cart_id).await? {
            Some(_) => Ok(CheckoutRecorded::AlreadyRecorded),
            None => Ok(CheckoutRecorded::MissingReport),
        }
    }
}
