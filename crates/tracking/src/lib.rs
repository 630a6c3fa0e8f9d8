//! Tracking ledger for the commerce backend.
//!
//! An append-only sequence of status events per order. Recording an event
//! can reconcile the order's own status through a fixed mapping and fires
//! a customer notification best-effort. Entries are immutable once
//! written; the only permitted mutation is flipping the notification flag.

pub mod entry;
pub mod error;
pub mod reconcile;
pub mod service;
pub mod store;

pub use entry::{NewTrackingEvent, TrackingEntry, TrackingStatus};
pub use error::TrackingError;
pub use reconcile::order_status_for;
pub use service::{TrackingHistory, TrackingService, TrackingStats, TrackingStatusCount};
pub use store::{InMemoryTrackingStore, PostgresTrackingStore, TrackingStore};
