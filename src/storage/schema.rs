//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Cart event log.
#[derive(Iden)]
pub enum Events {
    #[iden = "cart_events"]
    Table,
    #[iden = "ordering"]
    Ordering,
    #[iden = "cart_id"]
    CartId,
    #[iden = "sequence_nr"]
    SequenceNr,
    #[iden = "tag"]
    Tag,
    #[iden = "event_type"]
    EventType,
    #[iden = "payload"]
    Payload,
    #[iden = "created_at"]
    CreatedAt,
}

/// Cart state snapshots.
#[derive(Iden)]
pub enum Snapshots {
    #[iden = "cart_snapshots"]
    Table,
    #[iden = "cart_id"]
    CartId,
    #[iden = "sequence_nr"]
    SequenceNr,
    #[iden = "state"]
    State,
    #[iden = "created_at"]
    CreatedAt,
}

/// Read-side consumer offsets.
#[derive(Iden)]
pub enum Offsets {
    #[iden = "read_side_offsets"]
    Table,
    #[iden = "consumer_id"]
    ConsumerId,
    #[iden = "tag"]
    Tag,
    #[iden = "offset_value"]
    OffsetValue,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Cart report projection.
#[derive(Iden)]
pub enum Reports {
    #[iden = "shopping_cart_report"]
    Table,
    #[iden = "cart_id"]
    CartId,
    #[iden = "creation_date"]
    CreationDate,
    #[iden = "checkout_date"]
    CheckoutDate,
}

/// SQL for creating the events table.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cart_events (
    ordering INTEGER PRIMARY KEY AUTOINCREMENT,
    cart_id TEXT NOT NULL,
    sequence_nr INTEGER NOT NULL,
    tag TEXT NOT NULL,
    event_type TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (cart_id, sequence_nr)
);

CREATE INDEX IF NOT EXISTS idx_cart_events_tag ON cart_events(tag, ordering);
"#;

/// SQL for creating the snapshots table.
pub const CREATE_SNAPSHOTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cart_snapshots (
    cart_id TEXT NOT NULL,
    sequence_nr INTEGER NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (cart_id, sequence_nr)
);
"#;

/// SQL for creating the offsets table.
pub const CREATE_OFFSETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS read_side_offsets (
    consumer_id TEXT NOT NULL,
    tag TEXT NOT NULL,
    offset_value INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (consumer_id, tag)
);
"#;

/// SQL for creating the report table.
pub const CREATE_REPORTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS shopping_cart_report (
    cart_id TEXT PRIMARY KEY NOT NULL,
    creation_date TEXT NOT NULL,
    checkout_date TEXT
);
"#;
