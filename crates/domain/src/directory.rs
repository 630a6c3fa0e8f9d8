//! Narrow lookup traits for external collaborators.
//!
//! User, product, and vendor management live outside this system; the order
//! service only needs existence checks and snapshot data, so the contracts
//! stay deliberately small. In-memory implementations back tests and the
//! default binary wiring.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{ProductId, UserId, VendorId};
use thiserror::Error;

use crate::order::Money;

/// A user account, as far as the order core cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

/// A catalog product: name and price snapshot only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub vendor_id: Option<VendorId>,
}

/// A vendor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub is_active: bool,
}

/// The lookup backend was unreachable or misbehaved.
#[derive(Debug, Clone, Error)]
#[error("directory lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// Trait for user lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError>;
}

/// Trait for product lookups.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, DirectoryError>;
}

/// Trait for vendor lookups.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    async fn find_vendor(&self, id: VendorId) -> Result<Option<Vendor>, DirectoryError>;
}

/// In-memory user directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns its id.
    pub fn insert(&self, user: User) -> UserId {
        let id = user.id;
        self.users.write().unwrap().insert(id, user);
        id
    }

    /// Registers an active user with generated id.
    pub fn insert_active(&self, name: impl Into<String>, email: impl Into<String>) -> UserId {
        self.insert(User {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            is_active: true,
        })
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }
}

/// In-memory product catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a product and returns its id.
    pub fn insert(&self, product: Product) -> ProductId {
        let id = product.id;
        self.products.write().unwrap().insert(id, product);
        id
    }

    /// Registers a product with generated id.
    pub fn insert_priced(&self, name: impl Into<String>, price: Money) -> ProductId {
        self.insert(Product {
            id: ProductId::new(),
            name: name.into(),
            price,
            vendor_id: None,
        })
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, DirectoryError> {
        Ok(self.products.read().unwrap().get(&id).cloned())
    }
}

/// In-memory vendor directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVendorDirectory {
    vendors: Arc<RwLock<HashMap<VendorId, Vendor>>>,
}

impl InMemoryVendorDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vendor and returns its id.
    pub fn insert(&self, vendor: Vendor) -> VendorId {
        let id = vendor.id;
        self.vendors.write().unwrap().insert(id, vendor);
        id
    }

    /// Registers an active vendor with generated id.
    pub fn insert_active(&self, name: impl Into<String>) -> VendorId {
        self.insert(Vendor {
            id: VendorId::new(),
            name: name.into(),
            is_active: true,
        })
    }
}

#[async_trait]
impl VendorDirectory for InMemoryVendorDirectory {
    async fn find_vendor(&self, id: VendorId) -> Result<Option<Vendor>, DirectoryError> {
        Ok(self.vendors.read().unwrap().get(&id).cloned())
    }
}
