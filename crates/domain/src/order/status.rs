//! Order and payment status state machines.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Main chain:
/// ```text
/// Pending ─► Confirmed ─► Processing ─► ReadyForShipment ─► Shipped ─► OutForDelivery ─► Delivered
/// ```
/// Cancelled, Returned, Refunded, and PartiallyRefunded branch off from
/// multiple points; see [`OrderStatus::allowed_next`] for the full table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    ReadyForShipment,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
    PartiallyRefunded,
}

impl OrderStatus {
    /// Returns the statuses a guarded transition may move to from here.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Processing, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[ReadyForShipment, Shipped, Cancelled],
            ReadyForShipment => &[Shipped, Cancelled],
            Shipped => &[OutForDelivery, Delivered, Returned],
            OutForDelivery => &[Delivered, Returned],
            Delivered => &[Returned, Refunded, PartiallyRefunded],
            Returned => &[Refunded, PartiallyRefunded],
            Cancelled => &[Refunded],
            PartiallyRefunded => &[Refunded],
            Refunded => &[],
        }
    }

    /// Returns true if a guarded transition to `next` is legal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if no further guarded transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Returns true if the `cancel` operation is blocked in this status.
    ///
    /// The cancellation guard rejects exactly post-shipment statuses; the
    /// already-cancelled case is reported separately.
    pub fn blocks_cancellation(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::ReadyForShipment => "READY_FOR_SHIPMENT",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
            OrderStatus::Refunded => "REFUNDED",
            OrderStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "PROCESSING" => Some(OrderStatus::Processing),
            "READY_FOR_SHIPMENT" => Some(OrderStatus::ReadyForShipment),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "OUT_FOR_DELIVERY" => Some(OrderStatus::OutForDelivery),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "RETURNED" => Some(OrderStatus::Returned),
            "REFUNDED" => Some(OrderStatus::Refunded),
            "PARTIALLY_REFUNDED" => Some(OrderStatus::PartiallyRefunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status, tracked independently of the order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Returns true if payment processing can start from this status.
    pub fn can_begin(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    /// Returns true if the payment can be settled from this status.
    pub fn can_settle(&self) -> bool {
        matches!(self, PaymentStatus::Processing)
    }

    /// Returns true if the payment can be refunded from this status.
    pub fn can_refund(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::PartiallyRefunded
        )
    }

    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PROCESSING" => Some(PaymentStatus::Processing),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "PARTIALLY_REFUNDED" => Some(PaymentStatus::PartiallyRefunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a status update is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionMode {
    /// Check the transition table and reject illegal moves.
    #[default]
    Guarded,
    /// Apply any status. Administrative override; milestone stamping still
    /// happens.
    Force,
}

/// Outcome reported by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// Whether a refund covers the whole order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundScope {
    Full,
    Partial,
}
