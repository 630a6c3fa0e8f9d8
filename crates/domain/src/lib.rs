//! Domain layer for the commerce backend.
//!
//! This crate provides the core order abstractions:
//! - Order aggregate with its status and payment-status state machines
//! - OrderRepository trait with in-memory and Postgres implementations
//! - Narrow lookup traits for the user, product, and vendor collaborators
//! - OrderService orchestrating validation, persistence, and notifications

pub mod directory;
pub mod error;
pub mod order;
pub mod repository;

pub use directory::{
    DirectoryError, InMemoryProductCatalog, InMemoryUserDirectory, InMemoryVendorDirectory,
    Product, ProductCatalog, User, UserDirectory, Vendor, VendorDirectory,
};
pub use error::DomainError;
pub use order::{
    LineItem, Money, NewLineItem, NewOrder, Order, OrderAmounts, OrderError, OrderNumber,
    OrderService, OrderStats, OrderStatus, PaymentOutcome, PaymentStatus, RefundScope,
    ShippingAddress, StatusCount, TransitionMode, UpdateStatusOptions,
};
pub use repository::{
    InMemoryOrderRepository, OrderRepository, PostgresOrderRepository, RepositoryError,
};
