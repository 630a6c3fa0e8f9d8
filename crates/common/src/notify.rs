//! Notification dispatch contract.
//!
//! The core never depends on delivery mechanics (email, push, in-app): it
//! hands a [`NotificationRequest`] to a [`Notifier`] and moves on. Dispatch
//! is best-effort everywhere; call sites catch the error, log it, and let
//! the primary operation commit.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::UserId;

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    OrderConfirmation,
    OrderStatusChanged,
    OrderShipped,
    OrderDelivered,
    OrderCancelled,
    ReturnRequested,
    OrderEscalated,
    LowStock,
}

/// Delivery priority hint for the downstream channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// A single notification to dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Recipient.
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Free-form context (order number, carrier, product id, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NotificationRequest {
    /// Creates a normal-priority notification without metadata.
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            priority: NotificationPriority::default(),
            metadata: None,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches free-form metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Dispatch failed; the caller logs and continues.
#[derive(Debug, Clone)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification dispatch failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Trait for notification dispatch.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Dispatches a single notification.
    async fn dispatch(&self, request: NotificationRequest) -> Result<(), NotifyError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<NotificationRequest>,
    fail_on_dispatch: bool,
}

/// In-memory notifier for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail on subsequent dispatch calls.
    pub async fn set_fail_on_dispatch(&self, fail: bool) {
        self.state.write().await.fail_on_dispatch = fail;
    }

    /// Returns the number of dispatched notifications.
    pub async fn sent_count(&self) -> usize {
        self.state.read().await.sent.len()
    }

    /// Returns all dispatched notifications, oldest first.
    pub async fn sent(&self) -> Vec<NotificationRequest> {
        self.state.read().await.sent.clone()
    }

    /// Returns dispatched notifications of one kind, oldest first.
    pub async fn sent_of_kind(&self, kind: NotificationKind) -> Vec<NotificationRequest> {
        self.state
            .read()
            .await
            .sent
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn dispatch(&self, request: NotificationRequest) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;

        if state.fail_on_dispatch {
            return Err(NotifyError("channel unavailable".to_string()));
        }

        tracing::debug!(user_id = %request.user_id, kind = ?request.kind, "notification dispatched");
        state.sent.push(request);
        Ok(())
    }
}
