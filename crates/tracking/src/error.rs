//! Tracking ledger error types.

use common::OrderId;
use thiserror::Error;

/// Errors that can occur during tracking operations.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order has no tracking entries yet.
    #[error("no tracking entries for order: {0}")]
    NoTrackingFound(OrderId),

    /// A business-rule violation while reconciling the order.
    #[error("order error: {0}")]
    Order(#[from] domain::OrderError),

    /// The order repository failed.
    #[error(transparent)]
    OrderRepository(#[from] domain::RepositoryError),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
