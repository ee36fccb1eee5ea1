//! SQLite OffsetStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, from_db, to_db};
use crate::storage::schema::{Offsets, CREATE_OFFSETS_TABLE};
use crate::storage::{Offset, OffsetStore, Result};
use crate::tagging::Tag;

/// SQLite implementation of OffsetStore.
pub struct SqliteOffsetStore {
    pool: SqlitePool,
}

impl SqliteOffsetStore {
    /// Create a new SQLite offset store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the offsets table if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_OFFSETS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl OffsetStore for SqliteOffsetStore {
    async fn load(&self, consumer_id: &str, tag: &Tag) -> Result<Option<Offset>> {
        let query = Query::select()
            .column(Offsets::OffsetValue)
            .from(Offsets::Table)
            .and_where(Expr::col(Offsets::ConsumerId).eq(consumer_id))
            .and_where(Expr::col(Offsets::Tag).eq(tag.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let value: i64 = row.try_get("offset_value")?;
                Ok(Some(Offset::new(from_db(value)?)))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, consumer_id: &str, tag: &Tag, offset: Offset) -> Result<()> {
        let updated_at = format_timestamp(&chrono::Utc::now());

        let query = Query::insert()
            .into_table(Offsets::Table)
            .columns([
                Offsets::ConsumerId,
                Offsets::Tag,
                Offsets::OffsetValue,
                Offsets::UpdatedAt,
            ])
            .values_panic([
                consumer_id.into(),
                tag.as_str().into(),
                to_db(offset.value())?.into(),
                updated_at.into(),
            ])
            .on_conflict(
                OnConflict::columns([Offsets::ConsumerId, Offsets::Tag])
                    .update_columns([Offsets::OffsetValue, Offsets::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }
}
