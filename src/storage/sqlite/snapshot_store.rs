//! SQLite SnapshotStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::instrument;

use super::{format_timestamp, from_db, parse_timestamp, to_db};
use crate::cart::CartId;
use crate::storage::schema::{Snapshots, CREATE_SNAPSHOTS_TABLE};
use crate::storage::{Result, Snapshot, SnapshotStore};

/// SQLite implementation of SnapshotStore.
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Create a new SQLite snapshot store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the snapshots table if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_SNAPSHOTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn save_and_prune(
        conn: &mut SqliteConnection,
        snapshot: &Snapshot,
        keep: usize,
    ) -> Result<()> {
        let cart_id = snapshot.cart_id.as_str();

        let insert = Query::insert()
            .into_table(Snapshots::Table)
            .columns([
                Snapshots::CartId,
                Snapshots::SequenceNr,
                Snapshots::State,
                Snapshots::CreatedAt,
            ])
            .values_panic([
                cart_id.into(),
                to_db(snapshot.sequence_nr)?.into(),
                serde_json::to_string(&snapshot.state)?.into(),
                format_timestamp(&snapshot.created_at).into(),
            ])
            .on_conflict(
                OnConflict::columns([Snapshots::CartId, Snapshots::SequenceNr])
                    .update_columns([Snapshots::State, Snapshots::CreatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&insert).execute(&mut *conn).await?;

        let newest = Query::select()
            .column(Snapshots::SequenceNr)
            .from(Snapshots::Table)
            .and_where(Expr::col(Snapshots::CartId).eq(cart_id))
            .order_by(Snapshots::SequenceNr, Order::Desc)
            .limit(u64::try_from(keep).unwrap_or(u64::MAX))
            .to_owned();

        let prune = Query::delete()
            .from_table(Snapshots::Table)
            .and_where(Expr::col(Snapshots::CartId).eq(cart_id))
            .and_where(Expr::col(Snapshots::SequenceNr).not_in_subquery(newest))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&prune).execute(&mut *conn).await?;
        Ok(())
    }

    fn snapshot_from_row(row: &SqliteRow) -> Result<Snapshot> {
        let cart_id: String = row.try_get("cart_id")?;
        let state: String = row.try_get("state")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Snapshot {
            cart_id: CartId::new(cart_id),
            sequence_nr: from_db(row.try_get("sequence_nr")?)?,
            state: serde_json::from_str(&state)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn select_snapshots(cart_id: &CartId) -> sea_query::SelectStatement {
        Query::select()
            .columns([
                Snapshots::CartId,
                Snapshots::SequenceNr,
                Snapshots::State,
                Snapshots::CreatedAt,
            ])
            .from(Snapshots::Table)
            .and_where(Expr::col(Snapshots::CartId).eq(cart_id.as_str()))
            .to_owned()
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn latest(&self, cart_id: &CartId) -> Result<Option<Snapshot>> {
        let query = Self::select_snapshots(cart_id)
            .order_by(Snapshots::SequenceNr, Order::Desc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::snapshot_from_row).transpose()
    }

    #[instrument(skip_all, fields(cart_id = %snapshot.cart_id, sequence_nr = snapshot.sequence_nr))]
    async fn save(&self, snapshot: &Snapshot, keep: usize) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match Self::save_and_prune(&mut conn, snapshot, keep).await {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn list(&self, cart_id: &CartId) -> Result<Vec<Snapshot>> {
        let query = Self::select_snapshots(cart_id)
            .order_by(Snapshots::SequenceNr, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::snapshot_from_row).collect()
    }
}
