//! Order aggregate and related types.

mod aggregate;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use service::{
    NewLineItem, NewOrder, OrderService, OrderStats, StatusCount, UpdateStatusOptions,
};
pub use status::{OrderStatus, PaymentOutcome, PaymentStatus, RefundScope, TransitionMode};
pub use value_objects::{LineItem, Money, OrderAmounts, OrderNumber, ShippingAddress};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A guarded status update was rejected by the transition table.
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The order was already cancelled.
    #[error("order is already cancelled")]
    AlreadyCancelled,

    /// Cancellation is blocked post-shipment.
    #[error("cannot cancel an order in {status} status")]
    CannotCancel { status: OrderStatus },

    /// Returns are only accepted for delivered orders.
    #[error("cannot request a return for an order in {status} status")]
    ReturnNotEligible { status: OrderStatus },

    /// Only the owning user may request a return.
    #[error("only the order's owner may request a return")]
    NotOrderOwner,

    /// A return was already requested for this order.
    #[error("a return has already been requested for this order")]
    ReturnAlreadyRequested,

    /// The order was already escalated.
    #[error("order is already escalated")]
    AlreadyEscalated,

    /// Payment operation not valid for the current payment status.
    #[error("invalid payment transition from {from}")]
    InvalidPaymentTransition { from: PaymentStatus },

    /// Order must contain at least one line item.
    #[error("order has no line items")]
    EmptyOrder,

    /// Line quantities must be positive.
    #[error("invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A monetary field that must be non-negative was negative.
    #[error("negative amount for {field}")]
    NegativeAmount { field: &'static str },

    /// The caller-supplied total does not match the computed total.
    #[error("total amount mismatch: computed {computed}, given {given}")]
    AmountMismatch { computed: Money, given: Money },
}
