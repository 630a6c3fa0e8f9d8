//! Tracking ledger persistence.
//!
//! The ledger is append-only: entries never change after insertion except
//! for the notification flag, which gets its own narrow mutation.

mod memory;
mod postgres;

pub use memory::InMemoryTrackingStore;
pub use postgres::PostgresTrackingStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, TrackingEntryId};

use crate::entry::{TrackingEntry, TrackingStatus};
use crate::error::TrackingError;

/// Trait for tracking ledger storage.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Appends an entry to the ledger.
    async fn append(&self, entry: TrackingEntry) -> Result<TrackingEntry, TrackingError>;

    /// Marks an entry's customer notification as sent.
    async fn mark_notification_sent(
        &self,
        id: TrackingEntryId,
        at: DateTime<Utc>,
    ) -> Result<(), TrackingError>;

    /// All entries for an order, oldest first.
    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<TrackingEntry>, TrackingError>;

    /// The most recently created entry for an order, if any.
    async fn latest_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<TrackingEntry>, TrackingError>;

    /// Per status, the number of distinct orders with at least one entry
    /// of that status.
    async fn count_orders_by_status(
        &self,
    ) -> Result<Vec<(TrackingStatus, u64)>, TrackingError>;
}
