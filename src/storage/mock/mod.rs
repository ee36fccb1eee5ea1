//! In-memory storage implementations.
//!
//! Back the `memory` storage type and every unit test. Failure toggles let
//! tests exercise the error paths of the components built on top.

mod event_store;
mod offset_store;
mod report_store;
mod snapshot_store;


pub use event_store::MockEventStore;
pub use offset_store::MockOffsetStore;
pub use report_store::MockCartReportRepository;
pub use snapshot_store::MockSnapshotStore;
