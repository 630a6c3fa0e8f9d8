//! Stock ledger for the commerce backend.
//!
//! One record per (product, vendor) pair, with current/reserved/available
//! counts, derived low-stock and out-of-stock flags, and a bounded audit
//! history of every adjustment.

pub mod error;
pub mod record;
pub mod service;
pub mod store;

pub use error::InventoryError;
pub use record::{
    HISTORY_CAP, NewStockRecord, StockAdjustment, StockMovement, StockMovementKind, StockRecord,
};
pub use service::{BulkImportFailure, BulkImportReport, StockImportRow, StockService};
pub use store::{InMemoryStockStore, PostgresStockStore, StockStore};
