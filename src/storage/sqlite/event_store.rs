//! SQLite EventStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use super::{format_timestamp, from_db, parse_timestamp, to_db};
use crate::cart::{CartEvent, CartId};
use crate::storage::schema::{Events, CREATE_EVENTS_TABLE};
use crate::storage::{EventEnvelope, EventStore, Offset, Result, StorageError};
use crate::tagging::Tag;

/// SQLite implementation of EventStore.
///
/// The autoincrement `ordering` column is the global offset.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new SQLite event store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the events table if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert events within an already-started transaction.
    async fn insert_events(
        conn: &mut SqliteConnection,
        cart_id: &CartId,
        tag: &Tag,
        expected_sequence_nr: u64,
        events: &[CartEvent],
    ) -> Result<Vec<EventEnvelope>> {
        let query = Query::select()
            .expr(Expr::col(Events::SequenceNr).max())
            .from(Events::Table)
            .and_where(Expr::col(Events::CartId).eq(cart_id.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&mut *conn).await?;
        let highest: Option<i64> = row.try_get(0)?;
        let next = highest.map(from_db).transpose()?.unwrap_or(0) + 1;

        if next != expected_sequence_nr {
            return Err(StorageError::SequenceConflict {
                cart_id: cart_id.clone(),
                expected: expected_sequence_nr,
                actual: next,
            });
        }

        let mut envelopes = Vec::with_capacity(events.len());
        for (sequence_nr, event) in (next..).zip(events) {
            let payload = event.to_payload()?;
            let created_at = event.event_time();

            let query = Query::insert()
                .into_table(Events::Table)
                .columns([
                    Events::CartId,
                    Events::SequenceNr,
                    Events::Tag,
                    Events::EventType,
                    Events::Payload,
                    Events::CreatedAt,
                ])
                .values_panic([
                    cart_id.as_str().into(),
                    to_db(sequence_nr)?.into(),
                    tag.as_str().into(),
                    event.event_type().into(),
                    payload.to_string().into(),
                    format_timestamp(&created_at).into(),
                ])
                .to_string(SqliteQueryBuilder);

            let result = sqlx::query(&query).execute(&mut *conn).await?;

            envelopes.push(EventEnvelope {
                cart_id: cart_id.clone(),
                sequence_nr,
                tag: tag.clone(),
                offset: Offset::new(from_db(result.last_insert_rowid())?),
                event_type: event.event_type().to_string(),
                payload,
                created_at,
            });
        }

        Ok(envelopes)
    }

    fn envelope_from_row(row: &SqliteRow) -> Result<EventEnvelope> {
        let cart_id: String = row.try_get("cart_id")?;
        let tag: String = row.try_get("tag")?;
        let payload: String = row.try_get("payload")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(EventEnvelope {
            cart_id: CartId::new(cart_id),
            sequence_nr: from_db(row.try_get("sequence_nr")?)?,
            tag: Tag::new(tag),
            offset: Offset::new(from_db(row.try_get("ordering")?)?),
            event_type: row.try_get("event_type")?,
            payload: serde_json::from_str(&payload)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn select_envelopes() -> sea_query::SelectStatement {
        Query::select()
            .columns([
                Events::Ordering,
                Events::CartId,
                Events::SequenceNr,
                Events::Tag,
                Events::EventType,
                Events::Payload,
                Events::CreatedAt,
            ])
            .from(Events::Table)
            .to_owned()
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip_all, fields(cart_id = %cart_id, tag = %tag, count = events.len()))]
    async fn append(
        &self,
        cart_id: &CartId,
        tag: &Tag,
        expected_sequence_nr: u64,
        events: &[CartEvent],
    ) -> Result<Vec<EventEnvelope>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        // BEGIN IMMEDIATE takes the write lock upfront, so rows become
        // visible in the same order their offsets were assigned.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result =
            Self::insert_events(&mut conn, cart_id, tag, expected_sequence_nr, events).await;

        match result {
            Ok(envelopes) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                debug!(
                    last_sequence_nr = envelopes.last().map(|e| e.sequence_nr),
                    "events appended"
                );
                Ok(envelopes)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn load_from(
        &self,
        cart_id: &CartId,
        from_sequence_nr: u64,
    ) -> Result<Vec<EventEnvelope>> {
        let query = Self::select_envelopes()
            .and_where(Expr::col(Events::CartId).eq(cart_id.as_str()))
            .and_where(Expr::col(Events::SequenceNr).gte(to_db(from_sequence_nr)?))
            .order_by(Events::SequenceNr, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::envelope_from_row).collect()
    }

    async fn highest_sequence_nr(&self, cart_id: &CartId) -> Result<u64> {
        let query = Query::select()
            .expr(Expr::col(Events::SequenceNr).max())
            .from(Events::Table)
            .and_where(Expr::col(Events::CartId).eq(cart_id.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let highest: Option<i64> = row.try_get(0)?;
        Ok(highest.map(from_db).transpose()?.unwrap_or(0))
    }

    async fn read_tagged(
        &self,
        tag: &Tag,
        after: Offset,
        limit: usize,
    ) -> Result<Vec<EventEnvelope>> {
        let limit = u64::try_from(limit).unwrap_or(u64::MAX);
        let query = Self::select_envelopes()
            .and_where(Expr::col(Events::Tag).eq(tag.as_str()))
            .and_where(Expr::col(Events::Ordering).gt(to_db(after.value())?))
            .order_by(Events::Ordering, Order::Asc)
            .limit(limit)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::envelope_from_row).collect()
    }
}
