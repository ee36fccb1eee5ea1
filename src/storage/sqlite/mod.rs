//! SQLite implementations of storage interfaces.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{Result, StorageError};

mod event_store;
mod offset_store;
mod report_store;
mod snapshot_store;

pub use event_store::SqliteEventStore;
pub use offset_store::SqliteOffsetStore;
pub use report_store::SqliteCartReportRepository;
pub use snapshot_store::SqliteSnapshotStore;

/// Timestamps are stored as RFC 3339 text with nanosecond precision.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("{}: {}", text, e)))
}

pub(crate) fn to_db(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StorageError::InvalidData(format!("{} exceeds i64", value)))
}

pub(crate) fn from_db(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StorageError::InvalidData(format!("negative value {}", value)))
}
