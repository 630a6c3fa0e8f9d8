//! Integration tests across the order service and the tracking ledger.

use std::sync::Arc;

use common::{InMemoryNotifier, UserId};
use domain::{
    InMemoryOrderRepository, InMemoryProductCatalog, InMemoryUserDirectory,
    InMemoryVendorDirectory, Money, NewLineItem, NewOrder, Order, OrderService, OrderStatus,
    ShippingAddress,
};
use tracking::{InMemoryTrackingStore, NewTrackingEvent, TrackingService, TrackingStatus};

struct World {
    orders: OrderService,
    tracking: TrackingService,
    users: Arc<InMemoryUserDirectory>,
    catalog: Arc<InMemoryProductCatalog>,
}

fn world() -> World {
    let repository = Arc::new(InMemoryOrderRepository::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let catalog = Arc::new(InMemoryProductCatalog::new());
    let vendors = Arc::new(InMemoryVendorDirectory::new());
    let notifier = Arc::new(InMemoryNotifier::new());

    let orders = OrderService::new(
        repository.clone(),
        users.clone(),
        catalog.clone(),
        vendors,
        notifier.clone(),
    );
    let tracking = TrackingService::new(
        repository,
        Arc::new(InMemoryTrackingStore::new()),
        notifier,
    );

    World {
        orders,
        tracking,
        users,
        catalog,
    }
}

async fn place_order(w: &World, user_id: UserId) -> Order {
    let widget = w.catalog.insert_priced("Widget", Money::from_cents(1000));
    let gadget = w.catalog.insert_priced("Gadget", Money::from_cents(500));

    w.orders
        .create(NewOrder {
            user_id,
            vendor_id: None,
            items: vec![
                NewLineItem {
                    product_id: widget,
                    quantity: 2,
                    unit_price: None,
                },
                NewLineItem {
                    product_id: gadget,
                    quantity: 1,
                    unit_price: None,
                },
            ],
            tax_amount: Money::zero(),
            shipping_amount: Money::zero(),
            discount_amount: Money::zero(),
            total_amount: None,
            shipping_address: ShippingAddress {
                recipient: "Jo Moreno".to_string(),
                line1: "1 Harbor Way".to_string(),
                line2: None,
                city: "Oakland".to_string(),
                region: "CA".to_string(),
                postal_code: "94607".to_string(),
                country: "US".to_string(),
            },
            payment_status: None,
            created_by: user_id,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn shipped_event_reconciles_fresh_order() {
    let w = world();
    let user_id = w.users.insert_active("Ada", "ada@example.com");
    let order = place_order(&w, user_id).await;

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.amounts.subtotal.cents(), 2500);

    let mut event = NewTrackingEvent::status_only(order.id, TrackingStatus::Shipped, user_id);
    event.carrier = Some("FedEx".to_string());
    let (entry, updated) = w.tracking.update_order_status(event).await.unwrap();

    assert_eq!(entry.carrier.as_deref(), Some("FedEx"));
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert!(updated.shipped_at.is_some());

    let latest = w.tracking.latest(order.id).await.unwrap();
    assert_eq!(latest.status, TrackingStatus::Shipped);
}

#[tokio::test]
async fn ledger_walk_keeps_order_in_step() {
    let w = world();
    let user_id = w.users.insert_active("Ada", "ada@example.com");
    let order = place_order(&w, user_id).await;

    let steps = [
        (TrackingStatus::Confirmed, OrderStatus::Processing),
        (TrackingStatus::Processing, OrderStatus::Processing),
        (TrackingStatus::Shipped, OrderStatus::Shipped),
        (TrackingStatus::OutForDelivery, OrderStatus::Shipped),
        (TrackingStatus::Delivered, OrderStatus::Delivered),
    ];

    for (tracking_status, expected) in steps {
        let (_, updated) = w
            .tracking
            .update_order_status(NewTrackingEvent::status_only(
                order.id,
                tracking_status,
                user_id,
            ))
            .await
            .unwrap();
        assert_eq!(updated.status, expected, "after {tracking_status}");
    }

    let history = w.tracking.history(order.id).await.unwrap();
    assert_eq!(history.entries.len(), 5);
    assert_eq!(history.current_status, Some(TrackingStatus::Delivered));

    let order = w.orders.get(order.id).await.unwrap().unwrap();
    assert!(order.shipped_at.is_some());
    assert!(order.delivered_at.is_some());
}

#[tokio::test]
async fn refunded_event_collapses_to_cancelled() {
    let w = world();
    let user_id = w.users.insert_active("Ada", "ada@example.com");
    let order = place_order(&w, user_id).await;

    let (_, updated) = w
        .tracking
        .update_order_status(NewTrackingEvent::status_only(
            order.id,
            TrackingStatus::Refunded,
            user_id,
        ))
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Cancelled);
    assert!(updated.cancelled_at.is_some());
}
