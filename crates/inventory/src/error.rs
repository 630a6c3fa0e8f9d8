//! Stock ledger error types.

use common::{InventoryId, ProductId, VendorId};
use thiserror::Error;

/// Errors that can occur during stock operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// No stock record with the given id.
    #[error("stock record not found: {0}")]
    NotFound(InventoryId),

    /// A record for this (product, vendor) pair already exists.
    #[error("stock record already exists for product {product_id} and vendor {vendor_id}")]
    DuplicateInventory {
        product_id: ProductId,
        vendor_id: VendorId,
    },

    /// An OUT adjustment asked for more than is on hand.
    #[error("insufficient stock: requested {requested}, on hand {on_hand}")]
    InsufficientStock { requested: u32, on_hand: u32 },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
