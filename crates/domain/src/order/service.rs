//! Order service orchestrating validation, persistence, and notifications.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::{
    NotificationKind, NotificationPriority, NotificationRequest, Notifier, OrderId, ProductId,
    UserId, VendorId,
};

use crate::directory::{ProductCatalog, UserDirectory, VendorDirectory};
use crate::error::DomainError;
use crate::repository::{OrderRepository, RepositoryError};

use super::{
    LineItem, Money, Order, OrderAmounts, OrderError, OrderNumber, OrderStatus, PaymentOutcome,
    PaymentStatus, RefundScope, ShippingAddress, TransitionMode,
};

const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// One requested order line. The product name is always snapshotted from
/// the catalog; the unit price defaults to the catalog price when omitted.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Option<Money>,
}

/// Everything needed to create an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub vendor_id: Option<VendorId>,
    pub items: Vec<NewLineItem>,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    /// When given, checked against the computed total.
    pub total_amount: Option<Money>,
    pub shipping_address: ShippingAddress,
    /// Administrative imports may start in a non-PENDING payment status.
    pub payment_status: Option<PaymentStatus>,
    pub created_by: UserId,
}

/// Options for a status update.
#[derive(Debug, Clone, Default)]
pub struct UpdateStatusOptions {
    pub mode: TransitionMode,
    pub vendor_notes: Option<String>,
    pub updated_by: Option<UserId>,
}

/// Count of orders currently in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Aggregate order statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    /// Counts per status, largest first.
    pub by_status: Vec<StatusCount>,
    /// Sum of totals over payment-completed orders.
    pub revenue: Money,
}

/// Service for managing orders.
///
/// Collaborator lookups and notification dispatch are injected; every
/// notification is best-effort and never fails the primary operation.
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    users: Arc<dyn UserDirectory>,
    catalog: Arc<dyn ProductCatalog>,
    vendors: Arc<dyn VendorDirectory>,
    notifier: Arc<dyn Notifier>,
    /// Recipient for escalation notices, when configured.
    ops_contact: Option<UserId>,
}

impl OrderService {
    /// Creates a new order service.
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn ProductCatalog>,
        vendors: Arc<dyn VendorDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            users,
            catalog,
            vendors,
            notifier,
            ops_contact: None,
        }
    }

    /// Sets the recipient of escalation notices.
    pub fn with_ops_contact(mut self, ops_contact: UserId) -> Self {
        self.ops_contact = Some(ops_contact);
        self
    }

    /// Returns the repository handle.
    pub fn repository(&self) -> Arc<dyn OrderRepository> {
        self.repository.clone()
    }

    /// Creates a new order in PENDING status.
    #[tracing::instrument(skip(self, new_order), fields(user_id = %new_order.user_id))]
    pub async fn create(&self, new_order: NewOrder) -> Result<Order, DomainError> {
        let user = self
            .users
            .find_user(new_order.user_id)
            .await?
            .ok_or(DomainError::UserNotFound(new_order.user_id))?;
        if !user.is_active {
            return Err(DomainError::UserInactive(user.id));
        }

        if let Some(vendor_id) = new_order.vendor_id {
            self.vendors
                .find_vendor(vendor_id)
                .await?
                .ok_or(DomainError::VendorNotFound(vendor_id))?;
        }

        if new_order.items.is_empty() {
            return Err(OrderError::EmptyOrder.into());
        }
        for (field, amount) in [
            ("tax_amount", new_order.tax_amount),
            ("shipping_amount", new_order.shipping_amount),
            ("discount_amount", new_order.discount_amount),
        ] {
            if amount.is_negative() {
                return Err(OrderError::NegativeAmount { field }.into());
            }
        }

        let mut items = Vec::with_capacity(new_order.items.len());
        for requested in &new_order.items {
            if requested.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: requested.quantity,
                }
                .into());
            }

            let product = self
                .catalog
                .find_product(requested.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound(requested.product_id))?;

            let unit_price = requested.unit_price.unwrap_or(product.price);
            if unit_price.is_negative() {
                return Err(OrderError::NegativeAmount { field: "unit_price" }.into());
            }

            items.push(LineItem::new(
                product.id,
                product.name,
                requested.quantity,
                unit_price,
                product.vendor_id.or(new_order.vendor_id),
            ));
        }

        let subtotal = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.total_price);
        let amounts = OrderAmounts::from_parts(
            subtotal,
            new_order.tax_amount,
            new_order.shipping_amount,
            new_order.discount_amount,
        );
        if let Some(given) = new_order.total_amount
            && given != amounts.total_amount
        {
            return Err(OrderError::AmountMismatch {
                computed: amounts.total_amount,
                given,
            }
            .into());
        }

        let now = Utc::now();
        let mut order = Order::new(
            OrderNumber::generate(now),
            user.id,
            new_order.vendor_id,
            items,
            amounts,
            new_order.shipping_address,
            new_order.payment_status.unwrap_or_default(),
            new_order.created_by,
            now,
        );

        // The number suffix is random; the repository's uniqueness guarantee
        // plus bounded regeneration covers the rare collision.
        let mut attempt = 1;
        let order = loop {
            match self.repository.insert(order.clone()).await {
                Ok(inserted) => break inserted,
                Err(RepositoryError::DuplicateOrderNumber(number)) => {
                    tracing::warn!(%number, attempt, "order number collision, regenerating");
                    if attempt >= ORDER_NUMBER_ATTEMPTS {
                        return Err(DomainError::OrderNumberExhausted {
                            attempts: ORDER_NUMBER_ATTEMPTS,
                        });
                    }
                    attempt += 1;
                    order.order_number = OrderNumber::generate(now);
                }
                Err(err) => return Err(err.into()),
            }
        };

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, order_number = %order.order_number, "order created");

        self.notify(
            NotificationRequest::new(
                order.user_id,
                NotificationKind::OrderConfirmation,
                "Order placed",
                format!("Your order {} has been placed.", order.order_number),
            )
            .with_metadata(serde_json::json!({ "order_number": order.order_number })),
        )
        .await;

        Ok(order)
    }

    /// Updates an order's status, stamping the matching milestone.
    #[tracing::instrument(skip(self, options))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        options: UpdateStatusOptions,
    ) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;
        let previous = order.status;

        order.apply_status(new_status, options.mode, Utc::now())?;
        if let Some(notes) = options.vendor_notes {
            order.vendor_notes = Some(notes);
        }
        if options.updated_by.is_some() {
            order.updated_by = options.updated_by;
        }

        let order = self.repository.update(order).await?;
        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(%order_id, %previous, status = %order.status, "order status updated");

        self.notify(NotificationRequest::new(
            order.user_id,
            NotificationKind::OrderStatusChanged,
            "Order update",
            format!("Order {} is now {}.", order.order_number, order.status),
        ))
        .await;

        Ok(order)
    }

    /// Cancels an order pre-shipment.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        order_id: OrderId,
        reason: impl Into<String> + Send,
        actor: UserId,
    ) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;

        order.cancel(reason, Utc::now())?;
        order.updated_by = Some(actor);

        let order = self.repository.update(order).await?;
        metrics::counter!("order_cancellations_total").increment(1);

        self.notify(NotificationRequest::new(
            order.user_id,
            NotificationKind::OrderCancelled,
            "Order cancelled",
            format!("Order {} has been cancelled.", order.order_number),
        ))
        .await;

        Ok(order)
    }

    /// Records a return request for a delivered order.
    #[tracing::instrument(skip(self, reason))]
    pub async fn request_return(
        &self,
        order_id: OrderId,
        reason: impl Into<String> + Send,
        requested_by: UserId,
    ) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;

        order.request_return(requested_by, reason, Utc::now())?;

        let order = self.repository.update(order).await?;

        self.notify(NotificationRequest::new(
            order.user_id,
            NotificationKind::ReturnRequested,
            "Return requested",
            format!("We received your return request for order {}.", order.order_number),
        ))
        .await;

        Ok(order)
    }

    /// Escalates an order to the administrative channel.
    #[tracing::instrument(skip(self, reason))]
    pub async fn escalate(
        &self,
        order_id: OrderId,
        reason: impl Into<String> + Send,
        actor: UserId,
    ) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;

        order.escalate(reason, Utc::now())?;
        order.updated_by = Some(actor);

        let order = self.repository.update(order).await?;

        match self.ops_contact {
            Some(ops_contact) => {
                self.notify(
                    NotificationRequest::new(
                        ops_contact,
                        NotificationKind::OrderEscalated,
                        "Order escalated",
                        format!(
                            "Order {} was escalated: {}",
                            order.order_number,
                            order.escalation_reason.as_deref().unwrap_or("")
                        ),
                    )
                    .with_priority(NotificationPriority::High),
                )
                .await;
            }
            None => {
                tracing::debug!(%order_id, "no ops contact configured, escalation not dispatched");
            }
        }

        Ok(order)
    }

    /// Moves the order's payment into PROCESSING.
    #[tracing::instrument(skip(self))]
    pub async fn begin_payment(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;
        order.begin_payment(Utc::now())?;
        Ok(self.repository.update(order).await?)
    }

    /// Settles a processing payment. Idempotent on repeated outcomes.
    #[tracing::instrument(skip(self))]
    pub async fn settle_payment(
        &self,
        order_id: OrderId,
        outcome: PaymentOutcome,
    ) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;
        let changed = order.settle_payment(outcome, Utc::now())?;
        if !changed {
            return Ok(order);
        }
        Ok(self.repository.update(order).await?)
    }

    /// Refunds a completed payment.
    #[tracing::instrument(skip(self))]
    pub async fn refund_payment(
        &self,
        order_id: OrderId,
        scope: RefundScope,
    ) -> Result<Order, DomainError> {
        let mut order = self.require(order_id).await?;
        order.refund_payment(scope, Utc::now())?;
        Ok(self.repository.update(order).await?)
    }

    /// Loads an order by id.
    pub async fn get(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.repository.find(order_id).await?)
    }

    /// Loads an order by its human-readable number.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, DomainError> {
        Ok(self.repository.find_by_number(order_number).await?)
    }

    /// All orders for a user, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.list_for_user(user_id).await?)
    }

    /// All orders for a vendor, newest first.
    pub async fn list_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.list_for_vendor(vendor_id).await?)
    }

    /// Every order, newest first.
    pub async fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.list_all().await?)
    }

    /// Administrative hard delete.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, order_id: OrderId) -> Result<(), DomainError> {
        Ok(self.repository.remove(order_id).await?)
    }

    /// Counts orders per status and sums revenue over payment-completed
    /// orders.
    pub async fn stats(&self) -> Result<OrderStats, DomainError> {
        let orders = self.repository.list_all().await?;

        let mut by_status: HashMap<OrderStatus, u64> = HashMap::new();
        let mut revenue = Money::zero();
        for order in &orders {
            *by_status.entry(order.status).or_default() += 1;
            if order.payment_status == PaymentStatus::Completed {
                revenue += order.amounts.total_amount;
            }
        }

        let mut by_status: Vec<StatusCount> = by_status
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        by_status.sort_by(|a, b| b.count.cmp(&a.count).then(a.status.as_str().cmp(b.status.as_str())));

        Ok(OrderStats {
            total_orders: orders.len() as u64,
            by_status,
            revenue,
        })
    }

    async fn require(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.repository
            .find(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    async fn notify(&self, request: NotificationRequest) {
        if let Err(err) = self.notifier.dispatch(request).await {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(error = %err, "notification dispatch failed");
        }
    }
}
