//! Stock record persistence.
//!
//! `adjust` is the one compound operation: the store runs the whole
//! read-modify-write inside its own critical section (a write lock in
//! memory, a row lock in Postgres) so concurrent adjustments against the
//! same record cannot lose updates or oversell.

mod memory;
mod postgres;

pub use memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;

use async_trait::async_trait;
use common::{InventoryId, ProductId, VendorId};

use crate::error::InventoryError;
use crate::record::{StockAdjustment, StockRecord};

/// Trait for stock record storage.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Inserts a new record. Fails with
    /// [`InventoryError::DuplicateInventory`] when the (product, vendor)
    /// pair already has one.
    async fn insert(&self, record: StockRecord) -> Result<StockRecord, InventoryError>;

    /// Loads a record by id.
    async fn find(&self, id: InventoryId) -> Result<Option<StockRecord>, InventoryError>;

    /// Loads the record for a (product, vendor) pair.
    async fn find_by_pair(
        &self,
        product_id: ProductId,
        vendor_id: VendorId,
    ) -> Result<Option<StockRecord>, InventoryError>;

    /// Persists an updated record. Fails with [`InventoryError::NotFound`]
    /// when the record does not exist.
    async fn update(&self, record: StockRecord) -> Result<StockRecord, InventoryError>;

    /// Applies an adjustment atomically.
    ///
    /// Returns the updated record and whether it crossed into low-stock.
    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: StockAdjustment,
    ) -> Result<(StockRecord, bool), InventoryError>;

    /// Records currently flagged low-stock.
    async fn list_low_stock(&self) -> Result<Vec<StockRecord>, InventoryError>;

    /// Records currently flagged out-of-stock.
    async fn list_out_of_stock(&self) -> Result<Vec<StockRecord>, InventoryError>;

    /// Records for one product across vendors.
    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, InventoryError>;

    /// Records for one vendor across products.
    async fn list_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<StockRecord>, InventoryError>;
}
