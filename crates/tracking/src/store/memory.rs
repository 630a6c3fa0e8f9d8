use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, TrackingEntryId};
use tokio::sync::RwLock;

use super::TrackingStore;
use crate::entry::{TrackingEntry, TrackingStatus};
use crate::error::TrackingError;

/// In-memory tracking ledger for testing and local runs.
///
/// Entries keep their append order, which doubles as the created-at order
/// for reads.
#[derive(Clone, Default)]
pub struct InMemoryTrackingStore {
    entries: Arc<RwLock<Vec<TrackingEntry>>>,
}

impl InMemoryTrackingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries stored.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn append(&self, entry: TrackingEntry) -> Result<TrackingEntry, TrackingError> {
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn mark_notification_sent(
        &self,
        id: TrackingEntryId,
        at: DateTime<Utc>,
    ) -> Result<(), TrackingError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.is_notification_sent = true;
            entry.notification_sent_at = Some(at);
        }
        Ok(())
    }

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<TrackingEntry>, TrackingError> {
        let entries = self.entries.read().await;
        let mut result: Vec<_> = entries
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn latest_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<TrackingEntry>, TrackingError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.order_id == order_id)
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn count_orders_by_status(
        &self,
    ) -> Result<Vec<(TrackingStatus, u64)>, TrackingError> {
        let entries = self.entries.read().await;

        let mut orders_per_status: HashMap<TrackingStatus, HashSet<OrderId>> = HashMap::new();
        for entry in entries.iter() {
            orders_per_status
                .entry(entry.status)
                .or_default()
                .insert(entry.order_id);
        }

        let mut counts: Vec<(TrackingStatus, u64)> = orders_per_status
            .into_iter()
            .map(|(status, orders)| (status, orders.len() as u64))
            .collect();
        counts.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        Ok(counts)
    }
}
