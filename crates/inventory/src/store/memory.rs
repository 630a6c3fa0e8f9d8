use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{InventoryId, ProductId, VendorId};
use tokio::sync::RwLock;

use super::StockStore;
use crate::error::InventoryError;
use crate::record::{StockAdjustment, StockRecord};

/// In-memory stock store for testing and local runs.
///
/// Adjustments hold the write lock across the whole read-modify-write, so
/// concurrent calls against the same record serialize.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    records: Arc<RwLock<HashMap<InventoryId, StockRecord>>>,
}

impl InMemoryStockStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

fn sorted_oldest_first(mut records: Vec<StockRecord>) -> Vec<StockRecord> {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    records
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn insert(&self, record: StockRecord) -> Result<StockRecord, InventoryError> {
        let mut records = self.records.write().await;

        if records
            .values()
            .any(|r| r.product_id == record.product_id && r.vendor_id == record.vendor_id)
        {
            return Err(InventoryError::DuplicateInventory {
                product_id: record.product_id,
                vendor_id: record.vendor_id,
            });
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find(&self, id: InventoryId) -> Result<Option<StockRecord>, InventoryError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_pair(
        &self,
        product_id: ProductId,
        vendor_id: VendorId,
    ) -> Result<Option<StockRecord>, InventoryError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.product_id == product_id && r.vendor_id == vendor_id)
            .cloned())
    }

    async fn update(&self, record: StockRecord) -> Result<StockRecord, InventoryError> {
        let mut records = self.records.write().await;

        if !records.contains_key(&record.id) {
            return Err(InventoryError::NotFound(record.id));
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: StockAdjustment,
    ) -> Result<(StockRecord, bool), InventoryError> {
        let mut records = self.records.write().await;

        let record = records.get_mut(&id).ok_or(InventoryError::NotFound(id))?;
        let crossed_into_low = record.apply(&adjustment, Utc::now())?;

        Ok((record.clone(), crossed_into_low))
    }

    async fn list_low_stock(&self) -> Result<Vec<StockRecord>, InventoryError> {
        let records = self.records.read().await;
        Ok(sorted_oldest_first(
            records.values().filter(|r| r.is_low_stock).cloned().collect(),
        ))
    }

    async fn list_out_of_stock(&self) -> Result<Vec<StockRecord>, InventoryError> {
        let records = self.records.read().await;
        Ok(sorted_oldest_first(
            records
                .values()
                .filter(|r| r.is_out_of_stock)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        let records = self.records.read().await;
        Ok(sorted_oldest_first(
            records
                .values()
                .filter(|r| r.product_id == product_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        let records = self.records.read().await;
        Ok(sorted_oldest_first(
            records
                .values()
                .filter(|r| r.vendor_id == vendor_id)
                .cloned()
                .collect(),
        ))
    }
}
