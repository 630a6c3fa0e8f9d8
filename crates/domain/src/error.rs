//! Domain error types.

use common::{OrderId, ProductId, UserId, VendorId};
use thiserror::Error;

use crate::directory::DirectoryError;
use crate::order::OrderError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business-rule violation on the order aggregate.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// A storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A collaborator lookup failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The user exists but is deactivated.
    #[error("user is inactive: {0}")]
    UserInactive(UserId),

    /// The product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The vendor does not exist.
    #[error("vendor not found: {0}")]
    VendorNotFound(VendorId),

    /// Order number generation kept colliding.
    #[error("could not generate a unique order number after {attempts} attempts")]
    OrderNumberExhausted { attempts: u32 },
}
