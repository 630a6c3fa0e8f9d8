//! Shared types for the commerce backend.
//!
//! Typed identifiers used across crates, plus the notification-dispatch
//! contract that order, tracking, and inventory services all consume.

pub mod notify;
pub mod types;

pub use notify::{
    InMemoryNotifier, NotificationKind, NotificationPriority, NotificationRequest, Notifier,
    NotifyError,
};
pub use types::{InventoryId, OrderId, ProductId, TrackingEntryId, UserId, VendorId};
