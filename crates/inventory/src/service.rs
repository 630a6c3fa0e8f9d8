//! Stock service: adjustments, bulk import, and derived-flag queries.

use std::sync::Arc;

use chrono::Utc;
use common::{
    InventoryId, NotificationKind, NotificationPriority, NotificationRequest, Notifier, ProductId,
    UserId, VendorId,
};

use crate::error::InventoryError;
use crate::record::{NewStockRecord, StockAdjustment, StockRecord};
use crate::store::StockStore;

/// One row of a bulk stock import.
#[derive(Debug, Clone)]
pub struct StockImportRow {
    pub product_id: ProductId,
    pub current_stock: u32,
    pub reserved_stock: u32,
    pub low_stock_threshold: u32,
    pub stock_notes: Option<String>,
}

/// A row that could not be imported; the rest of the batch continues.
#[derive(Debug, Clone)]
pub struct BulkImportFailure {
    /// Zero-based row index within the batch.
    pub row: usize,
    pub product_id: ProductId,
    pub reason: String,
}

/// Outcome of a bulk import: successes plus per-row failures.
#[derive(Debug, Default)]
pub struct BulkImportReport {
    pub imported: Vec<StockRecord>,
    pub failures: Vec<BulkImportFailure>,
}

/// Service for the stock ledger.
pub struct StockService {
    store: Arc<dyn StockStore>,
    notifier: Arc<dyn Notifier>,
    /// Recipient for low-stock alerts, when configured.
    ops_contact: Option<UserId>,
}

impl StockService {
    /// Creates a new stock service.
    pub fn new(store: Arc<dyn StockStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            ops_contact: None,
        }
    }

    /// Sets the recipient of low-stock alerts.
    pub fn with_ops_contact(mut self, ops_contact: UserId) -> Self {
        self.ops_contact = Some(ops_contact);
        self
    }

    /// Creates a stock record for a (product, vendor) pair.
    #[tracing::instrument(skip(self, fields), fields(product_id = %fields.product_id, vendor_id = %fields.vendor_id))]
    pub async fn create(&self, fields: NewStockRecord) -> Result<StockRecord, InventoryError> {
        let record = StockRecord::new(fields, Utc::now());
        let record = self.store.insert(record).await?;
        tracing::info!(inventory_id = %record.id, "stock record created");
        Ok(record)
    }

    /// Applies an IN/OUT/ADJUSTMENT mutation.
    ///
    /// A false-to-true low-stock crossing dispatches an alert best-effort;
    /// alert failure never fails the adjustment.
    #[tracing::instrument(skip(self, adjustment), fields(kind = %adjustment.kind, quantity = adjustment.quantity))]
    pub async fn adjust(
        &self,
        id: InventoryId,
        adjustment: StockAdjustment,
    ) -> Result<StockRecord, InventoryError> {
        let (record, crossed_into_low) = self.store.adjust(id, adjustment).await?;
        metrics::counter!("stock_adjustments_total").increment(1);

        if crossed_into_low {
            metrics::counter!("low_stock_alerts_total").increment(1);
            self.send_low_stock_alert(&record).await;
        }

        Ok(record)
    }

    /// Imports a batch of rows for one vendor, find-or-create per row.
    ///
    /// Per-row failures are logged and reported; the batch continues with
    /// the remaining rows.
    #[tracing::instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub async fn bulk_import(
        &self,
        vendor_id: VendorId,
        rows: Vec<StockImportRow>,
        created_by: UserId,
    ) -> BulkImportReport {
        let mut report = BulkImportReport::default();

        for (index, row) in rows.into_iter().enumerate() {
            let product_id = row.product_id;
            match self.import_row(vendor_id, row, created_by).await {
                Ok(record) => report.imported.push(record),
                Err(err) => {
                    tracing::warn!(row = index, %product_id, error = %err, "bulk import row failed");
                    report.failures.push(BulkImportFailure {
                        row: index,
                        product_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            imported = report.imported.len(),
            failed = report.failures.len(),
            "bulk import finished"
        );
        report
    }

    async fn import_row(
        &self,
        vendor_id: VendorId,
        row: StockImportRow,
        created_by: UserId,
    ) -> Result<StockRecord, InventoryError> {
        match self.store.find_by_pair(row.product_id, vendor_id).await? {
            Some(mut existing) => {
                existing.apply_import(
                    row.current_stock,
                    row.reserved_stock,
                    row.low_stock_threshold,
                    row.stock_notes,
                    created_by,
                    Utc::now(),
                );
                self.store.update(existing).await
            }
            None => {
                let record = StockRecord::new(
                    NewStockRecord {
                        product_id: row.product_id,
                        vendor_id,
                        current_stock: row.current_stock,
                        reserved_stock: row.reserved_stock,
                        low_stock_threshold: row.low_stock_threshold,
                        stock_notes: row.stock_notes,
                        created_by,
                    },
                    Utc::now(),
                );
                self.store.insert(record).await
            }
        }
    }

    /// Loads a record by id.
    pub async fn get(&self, id: InventoryId) -> Result<Option<StockRecord>, InventoryError> {
        self.store.find(id).await
    }

    /// Loads the record for a (product, vendor) pair.
    pub async fn get_by_pair(
        &self,
        product_id: ProductId,
        vendor_id: VendorId,
    ) -> Result<Option<StockRecord>, InventoryError> {
        self.store.find_by_pair(product_id, vendor_id).await
    }

    /// Records currently flagged low-stock.
    pub async fn list_low_stock(&self) -> Result<Vec<StockRecord>, InventoryError> {
        self.store.list_low_stock().await
    }

    /// Records currently flagged out-of-stock.
    pub async fn list_out_of_stock(&self) -> Result<Vec<StockRecord>, InventoryError> {
        self.store.list_out_of_stock().await
    }

    /// Records for one product across vendors.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        self.store.list_for_product(product_id).await
    }

    /// Records for one vendor across products.
    pub async fn list_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        self.store.list_for_vendor(vendor_id).await
    }

    async fn send_low_stock_alert(&self, record: &StockRecord) {
        let Some(ops_contact) = self.ops_contact else {
            tracing::debug!(inventory_id = %record.id, "no ops contact configured, low-stock alert not dispatched");
            return;
        };

        let request = NotificationRequest::new(
            ops_contact,
            NotificationKind::LowStock,
            "Low stock",
            format!(
                "Product {} (vendor {}) is down to {} available.",
                record.product_id, record.vendor_id, record.available_stock
            ),
        )
        .with_priority(NotificationPriority::High)
        .with_metadata(serde_json::json!({
            "inventory_id": record.id,
            "available_stock": record.available_stock,
            "low_stock_threshold": record.low_stock_threshold,
        }));

        if let Err(err) = self.notifier.dispatch(request).await {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(error = %err, inventory_id = %record.id, "low-stock alert dispatch failed");
        }
    }
}
