//! Storage interfaces and backends.
//!
//! Four stores back the engine: the cart event log, snapshots, consumer
//! offsets and the report projection. Each is a trait shared as
//! `Arc<dyn …>`; `sqlite` is the durable backend and `mock` the in-memory
//! one.

use std::sync::Arc;

use tracing::{error, info};

use crate::cart::CartId;
use crate::config::StorageConfig;

pub mod event_store;
pub mod mock;
pub mod offset_store;
pub mod report_store;
pub mod snapshot_store;
pub mod stream;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use event_store::{EventEnvelope, EventStore, Offset};
pub use mock::{MockCartReportRepository, MockEventStore, MockOffsetStore, MockSnapshotStore};
pub use offset_store::OffsetStore;
pub use report_store::{CartReport, CartReportRepository, CheckoutRecorded};
pub use snapshot_store::{Snapshot, SnapshotStore};
pub use stream::{tagged_events, StreamSettings};

#[cfg(feature = "sqlite")]
pub use sqlite::{
    SqliteCartReportRepository, SqliteEventStore, SqliteOffsetStore, SqliteSnapshotStore,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sequence conflict for cart {cart_id}: expected {expected}, got {actual}")]
    SequenceConflict {
        cart_id: CartId,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// The full set of stores the engine runs on.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub offsets: Arc<dyn OffsetStore>,
    pub reports: Arc<dyn CartReportRepository>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            events: Arc::new(MockEventStore::new()),
            snapshots: Arc::new(MockSnapshotStore::new()),
            offsets: Arc::new(MockOffsetStore::new()),
            reports: Arc::new(MockCartReportRepository::new()),
        }
    }

    /// SQLite-backed stores sharing one pool. Creates missing tables.
    #[cfg(feature = "sqlite")]
    pub async fn sqlite(pool: sqlx::SqlitePool) -> Result<Self> {
        let events = SqliteEventStore::new(pool.clone());
        events.init().await?;
        let snapshots = SqliteSnapshotStore::new(pool.clone());
        snapshots.init().await?;
        let offsets = SqliteOffsetStore::new(pool.clone());
        offsets.init().await?;
        let reports = SqliteCartReportRepository::new(pool);
        reports.init().await?;

        Ok(Self {
            events: Arc::new(events),
            snapshots: Arc::new(snapshots),
            offsets: Arc::new(offsets),
            reports: Arc::new(reports),
        })
    }
}

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Stores, Box<dyn std::error::Error>> {
    match config.storage_type.as_str() {
        "memory" => {
            info!("Storage: in-memory");
            Ok(Stores::in_memory())
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = &config.sqlite.path;
            info!("Storage: sqlite at {}", path);

            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
            Ok(Stores::sqlite(pool).await?)
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
        other => {
            error!("Unknown storage type: {}", other);
            Err(format!("Unknown storage type: {}", other).into())
        }
    }
}
