//! Tracking service: ledger appends, reconciliation, and notifications.

use std::sync::Arc;

use chrono::Utc;
use common::{NotificationKind, NotificationRequest, Notifier, OrderId, UserId};
use domain::{Order, OrderRepository, TransitionMode};
use serde::Serialize;

use crate::entry::{NewTrackingEvent, TrackingEntry, TrackingStatus};
use crate::error::TrackingError;
use crate::reconcile::order_status_for;
use crate::store::TrackingStore;

/// The full ledger for one order plus its derived current status.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingHistory {
    /// Entries oldest first.
    pub entries: Vec<TrackingEntry>,
    /// Status of the most recent entry, if any.
    pub current_status: Option<TrackingStatus>,
}

/// Distinct-order count for one tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackingStatusCount {
    pub status: TrackingStatus,
    pub orders: u64,
}

/// Ledger-derived statistics.
///
/// Counts distinct orders per status by scanning ledger entries, so an
/// order appears under every status it has passed through and the totals
/// need not sum to the number of orders.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingStats {
    pub by_status: Vec<TrackingStatusCount>,
}

/// Service for the tracking ledger.
///
/// Every recorded event notifies the order's user best-effort; the entry's
/// notification flag records whether that dispatch succeeded.
pub struct TrackingService {
    orders: Arc<dyn OrderRepository>,
    store: Arc<dyn TrackingStore>,
    notifier: Arc<dyn Notifier>,
}

impl TrackingService {
    /// Creates a new tracking service.
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        store: Arc<dyn TrackingStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            orders,
            store,
            notifier,
        }
    }

    /// Appends a tracking entry without touching the order's status.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id, status = %event.status))]
    pub async fn create_entry(
        &self,
        event: NewTrackingEvent,
    ) -> Result<TrackingEntry, TrackingError> {
        let order = self.require_order(event.order_id).await?;
        self.append_and_notify(&order, event).await
    }

    /// Appends a tracking entry AND reconciles the order's status through
    /// the fixed mapping, stamping milestones on the order.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id, status = %event.status))]
    pub async fn update_order_status(
        &self,
        event: NewTrackingEvent,
    ) -> Result<(TrackingEntry, Order), TrackingError> {
        let mut order = self.require_order(event.order_id).await?;
        let tracking_status = event.status;

        let entry = self.append_and_notify(&order, event).await?;

        let mapped = order_status_for(tracking_status);
        // Reconciliation writes whatever the ledger says; the guard table
        // applies to direct status edits, not carrier-driven ones.
        order.apply_status(mapped, TransitionMode::Force, Utc::now())?;
        let order = self.orders.update(order).await?;

        tracing::info!(
            order_id = %order.id,
            tracking_status = %tracking_status,
            order_status = %order.status,
            "order status reconciled from tracking event"
        );

        Ok((entry, order))
    }

    /// Records a SHIPPED event and fires the carrier-specific notice.
    #[tracing::instrument(skip(self))]
    pub async fn mark_shipped(
        &self,
        order_id: OrderId,
        tracking_number: Option<String>,
        carrier: Option<String>,
        estimated_delivery: Option<chrono::DateTime<Utc>>,
        created_by: UserId,
    ) -> Result<(TrackingEntry, Order), TrackingError> {
        let event = NewTrackingEvent {
            order_id,
            status: TrackingStatus::Shipped,
            description: Some("Order shipped".to_string()),
            location: None,
            tracking_number: tracking_number.clone(),
            carrier: carrier.clone(),
            estimated_delivery,
            actual_delivery: None,
            created_by,
        };
        let (entry, order) = self.update_order_status(event).await?;

        self.notify(
            NotificationRequest::new(
                order.user_id,
                NotificationKind::OrderShipped,
                "Order shipped",
                match &carrier {
                    Some(carrier) => {
                        format!("Order {} shipped via {}.", order.order_number, carrier)
                    }
                    None => format!("Order {} has shipped.", order.order_number),
                },
            )
            .with_metadata(serde_json::json!({
                "carrier": carrier,
                "tracking_number": tracking_number,
            })),
        )
        .await;

        Ok((entry, order))
    }

    /// Records a DELIVERED event and fires the delivery notice.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        order_id: OrderId,
        created_by: UserId,
    ) -> Result<(TrackingEntry, Order), TrackingError> {
        let now = Utc::now();
        let event = NewTrackingEvent {
            order_id,
            status: TrackingStatus::Delivered,
            description: Some("Order delivered".to_string()),
            location: None,
            tracking_number: None,
            carrier: None,
            estimated_delivery: None,
            actual_delivery: Some(now),
            created_by,
        };
        let (entry, order) = self.update_order_status(event).await?;

        self.notify(NotificationRequest::new(
            order.user_id,
            NotificationKind::OrderDelivered,
            "Order delivered",
            format!("Order {} was delivered.", order.order_number),
        ))
        .await;

        Ok((entry, order))
    }

    /// Records a CANCELLED event and fires the cancellation notice.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        reason: impl Into<String> + Send,
        created_by: UserId,
    ) -> Result<(TrackingEntry, Order), TrackingError> {
        let reason = reason.into();
        let event = NewTrackingEvent {
            order_id,
            status: TrackingStatus::Cancelled,
            description: Some(reason.clone()),
            location: None,
            tracking_number: None,
            carrier: None,
            estimated_delivery: None,
            actual_delivery: None,
            created_by,
        };
        let (entry, order) = self.update_order_status(event).await?;

        self.notify(NotificationRequest::new(
            order.user_id,
            NotificationKind::OrderCancelled,
            "Order cancelled",
            format!("Order {} was cancelled: {}", order.order_number, reason),
        ))
        .await;

        Ok((entry, order))
    }

    /// Full ledger for an order, oldest first, plus the derived current
    /// status.
    pub async fn history(&self, order_id: OrderId) -> Result<TrackingHistory, TrackingError> {
        self.require_order(order_id).await?;
        let entries = self.store.list_for_order(order_id).await?;
        let current_status = entries.last().map(|entry| entry.status);
        Ok(TrackingHistory {
            entries,
            current_status,
        })
    }

    /// The most recent entry for an order.
    ///
    /// Fails with [`TrackingError::NoTrackingFound`] when the order exists
    /// but has no entries yet.
    pub async fn latest(&self, order_id: OrderId) -> Result<TrackingEntry, TrackingError> {
        self.require_order(order_id).await?;
        self.store
            .latest_for_order(order_id)
            .await?
            .ok_or(TrackingError::NoTrackingFound(order_id))
    }

    /// Ledger-derived statistics.
    pub async fn stats(&self) -> Result<TrackingStats, TrackingError> {
        let counts = self.store.count_orders_by_status().await?;
        Ok(TrackingStats {
            by_status: counts
                .into_iter()
                .map(|(status, orders)| TrackingStatusCount { status, orders })
                .collect(),
        })
    }

    async fn require_order(&self, order_id: OrderId) -> Result<Order, TrackingError> {
        self.orders
            .find(order_id)
            .await?
            .ok_or(TrackingError::OrderNotFound(order_id))
    }

    /// Appends the entry, then attempts the customer notification. Dispatch
    /// success flips the entry's flag; failure is logged and the entry
    /// stands as recorded.
    async fn append_and_notify(
        &self,
        order: &Order,
        event: NewTrackingEvent,
    ) -> Result<TrackingEntry, TrackingError> {
        let mut entry = TrackingEntry::from_event(event, Utc::now());
        entry = self.store.append(entry).await?;
        metrics::counter!("tracking_entries_total").increment(1);

        let mut message = format!("Order {} is now {}.", order.order_number, entry.status);
        if let Some(location) = &entry.location {
            message.push_str(&format!(" Last seen near {location}."));
        }

        let request = NotificationRequest::new(
            order.user_id,
            NotificationKind::OrderStatusChanged,
            "Order update",
            message,
        );

        match self.notifier.dispatch(request).await {
            Ok(()) => {
                let at = Utc::now();
                self.store.mark_notification_sent(entry.id, at).await?;
                entry.is_notification_sent = true;
                entry.notification_sent_at = Some(at);
            }
            Err(err) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(
                    error = %err,
                    entry_id = %entry.id,
                    "tracking notification dispatch failed"
                );
            }
        }

        Ok(entry)
    }

    async fn notify(&self, request: NotificationRequest) {
        if let Err(err) = self.notifier.dispatch(request).await {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(error = %err, "notification dispatch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{InMemoryNotifier, ProductId};
    use domain::{
        InMemoryOrderRepository, LineItem, Money, OrderAmounts, OrderNumber, OrderStatus,
        PaymentStatus, ShippingAddress,
    };

    use crate::store::InMemoryTrackingStore;

    struct Fixture {
        service: TrackingService,
        orders: Arc<InMemoryOrderRepository>,
        store: Arc<InMemoryTrackingStore>,
        notifier: Arc<InMemoryNotifier>,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let store = Arc::new(InMemoryTrackingStore::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let service = TrackingService::new(orders.clone(), store.clone(), notifier.clone());
        Fixture {
            service,
            orders,
            store,
            notifier,
        }
    }

    async fn seed_order(orders: &InMemoryOrderRepository) -> Order {
        let user_id = UserId::new();
        let items = vec![LineItem::new(
            ProductId::new(),
            "Widget",
            1,
            Money::from_cents(1000),
            None,
        )];
        let amounts = OrderAmounts::from_parts(
            Money::from_cents(1000),
            Money::zero(),
            Money::zero(),
            Money::zero(),
        );
        let order = Order::new(
            OrderNumber::generate(Utc::now()),
            user_id,
            None,
            items,
            amounts,
            ShippingAddress {
                recipient: "r".to_string(),
                line1: "l1".to_string(),
                line2: None,
                city: "c".to_string(),
                region: "r".to_string(),
                postal_code: "0".to_string(),
                country: "US".to_string(),
            },
            PaymentStatus::Pending,
            user_id,
            Utc::now(),
        );
        orders.insert(order).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_entry_requires_order() {
        let fx = fixture();
        let result = fx
            .service
            .create_entry(NewTrackingEvent::status_only(
                OrderId::new(),
                TrackingStatus::Pending,
                UserId::new(),
            ))
            .await;
        assert!(matches!(result, Err(TrackingError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_entry_notifies_and_flags() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        let entry = fx
            .service
            .create_entry(NewTrackingEvent::status_only(
                order.id,
                TrackingStatus::Confirmed,
                order.user_id,
            ))
            .await
            .unwrap();

        assert!(entry.is_notification_sent);
        assert!(entry.notification_sent_at.is_some());
        assert_eq!(
            fx.notifier
                .sent_of_kind(NotificationKind::OrderStatusChanged)
                .await
                .len(),
            1
        );

        // The persisted copy carries the flag too.
        let stored = fx.store.latest_for_order(order.id).await.unwrap().unwrap();
        assert!(stored.is_notification_sent);

        // create_entry alone does not touch the order status.
        let order = fx.orders.find(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_notification_failure_leaves_entry_recorded() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;
        fx.notifier.set_fail_on_dispatch(true).await;

        let entry = fx
            .service
            .create_entry(NewTrackingEvent::status_only(
                order.id,
                TrackingStatus::Confirmed,
                order.user_id,
            ))
            .await
            .unwrap();

        assert!(!entry.is_notification_sent);
        assert!(entry.notification_sent_at.is_none());
        assert_eq!(fx.store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_order_status_reconciles() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        let (_, updated) = fx
            .service
            .update_order_status(NewTrackingEvent::status_only(
                order.id,
                TrackingStatus::OutForDelivery,
                order.user_id,
            ))
            .await
            .unwrap();

        // OUT_FOR_DELIVERY collapses into SHIPPED on the order.
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert!(updated.shipped_at.is_some());
    }

    #[tokio::test]
    async fn test_returned_event_cancels_order() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        let (_, updated) = fx
            .service
            .update_order_status(NewTrackingEvent::status_only(
                order.id,
                TrackingStatus::Returned,
                order.user_id,
            ))
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Cancelled);
        assert!(updated.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_history_and_latest() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        for status in [
            TrackingStatus::Pending,
            TrackingStatus::Confirmed,
            TrackingStatus::Shipped,
        ] {
            fx.service
                .create_entry(NewTrackingEvent::status_only(
                    order.id,
                    status,
                    order.user_id,
                ))
                .await
                .unwrap();
        }

        let history = fx.service.history(order.id).await.unwrap();
        assert_eq!(history.entries.len(), 3);
        assert_eq!(history.entries[0].status, TrackingStatus::Pending);
        assert_eq!(history.entries[1].status, TrackingStatus::Confirmed);
        assert_eq!(history.entries[2].status, TrackingStatus::Shipped);
        assert_eq!(history.current_status, Some(TrackingStatus::Shipped));

        let latest = fx.service.latest(order.id).await.unwrap();
        assert_eq!(latest.status, TrackingStatus::Shipped);
    }

    #[tokio::test]
    async fn test_latest_without_entries_fails() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        let result = fx.service.latest(order.id).await;
        assert!(matches!(result, Err(TrackingError::NoTrackingFound(_))));

        // History on the same order is an empty ledger, not an error.
        let history = fx.service.history(order.id).await.unwrap();
        assert!(history.entries.is_empty());
        assert!(history.current_status.is_none());
    }

    #[tokio::test]
    async fn test_mark_shipped_fires_carrier_notice() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        let (entry, updated) = fx
            .service
            .mark_shipped(
                order.id,
                Some("1Z999".to_string()),
                Some("FedEx".to_string()),
                None,
                order.user_id,
            )
            .await
            .unwrap();

        assert_eq!(entry.carrier.as_deref(), Some("FedEx"));
        assert_eq!(updated.status, OrderStatus::Shipped);

        let shipped = fx.notifier.sent_of_kind(NotificationKind::OrderShipped).await;
        assert_eq!(shipped.len(), 1);
        assert!(shipped[0].message.contains("FedEx"));
    }

    #[tokio::test]
    async fn test_mark_delivered_and_cancel_wrappers() {
        let fx = fixture();
        let order = seed_order(&fx.orders).await;

        let (entry, updated) = fx
            .service
            .mark_delivered(order.id, order.user_id)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Delivered);
        assert!(entry.actual_delivery.is_some());
        assert_eq!(
            fx.notifier
                .sent_of_kind(NotificationKind::OrderDelivered)
                .await
                .len(),
            1
        );

        let order2 = seed_order(&fx.orders).await;
        let (_, cancelled) = fx
            .service
            .cancel_order(order2.id, "address unreachable", order2.user_id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            fx.notifier
                .sent_of_kind(NotificationKind::OrderCancelled)
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_stats_count_distinct_orders() {
        let fx = fixture();
        let order_a = seed_order(&fx.orders).await;
        let order_b = seed_order(&fx.orders).await;

        for _ in 0..2 {
            fx.service
                .create_entry(NewTrackingEvent::status_only(
                    order_a.id,
                    TrackingStatus::Shipped,
                    order_a.user_id,
                ))
                .await
                .unwrap();
        }
        fx.service
            .create_entry(NewTrackingEvent::status_only(
                order_b.id,
                TrackingStatus::Shipped,
                order_b.user_id,
            ))
            .await
            .unwrap();

        let stats = fx.service.stats().await.unwrap();
        let shipped = stats
            .by_status
            .iter()
            .find(|c| c.status == TrackingStatus::Shipped)
            .unwrap();
        assert_eq!(shipped.orders, 2);
    }
}
