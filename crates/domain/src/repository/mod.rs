//! Order persistence.
//!
//! The trait mirrors the narrow set of statements the services actually
//! issue. Two implementations: an in-memory store for tests and local runs,
//! and a Postgres store for deployments.

mod memory;
mod postgres;

pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;

use async_trait::async_trait;
use common::{OrderId, UserId, VendorId};
use thiserror::Error;

use crate::order::Order;

/// Errors raised by the order repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No order with the given id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The generated order number is already taken.
    #[error("duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order. Fails with [`RepositoryError::DuplicateOrderNumber`]
    /// when the order number is taken.
    async fn insert(&self, order: Order) -> Result<Order, RepositoryError>;

    /// Loads an order by id.
    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Loads an order by its human-readable number.
    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError>;

    /// Persists an updated order. Fails with [`RepositoryError::NotFound`]
    /// when the order does not exist.
    async fn update(&self, order: Order) -> Result<Order, RepositoryError>;

    /// Administrative hard delete.
    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError>;

    /// All orders for a user, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// All orders for a vendor, newest first.
    async fn list_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;
}
