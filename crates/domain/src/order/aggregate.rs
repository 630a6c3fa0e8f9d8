//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId, VendorId};
use serde::{Deserialize, Serialize};

use super::{
    LineItem, OrderAmounts, OrderError, OrderNumber, OrderStatus, PaymentOutcome, PaymentStatus,
    RefundScope, ShippingAddress, TransitionMode,
};

/// A purchase record owned by a user, optionally scoped to one vendor.
///
/// Mutations go through the methods below, which enforce the lifecycle
/// guards; the fields stay public because the struct is also the persisted
/// row shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub vendor_id: Option<VendorId>,
    pub items: Vec<LineItem>,
    pub amounts: OrderAmounts,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: ShippingAddress,

    // Milestones, stamped by status updates.
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,

    pub return_requested: bool,
    pub return_reason: Option<String>,
    pub return_requested_at: Option<DateTime<Utc>>,

    pub escalated: bool,
    pub escalation_reason: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,

    pub vendor_notes: Option<String>,
    pub admin_notes: Option<String>,

    pub created_by: UserId,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a fresh order in PENDING status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_number: OrderNumber,
        user_id: UserId,
        vendor_id: Option<VendorId>,
        items: Vec<LineItem>,
        amounts: OrderAmounts,
        shipping_address: ShippingAddress,
        payment_status: PaymentStatus,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_number,
            user_id,
            vendor_id,
            items,
            amounts,
            status: OrderStatus::Pending,
            payment_status,
            shipping_address,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
            return_requested: false,
            return_reason: None,
            return_requested_at: None,
            escalated: false,
            escalation_reason: None,
            escalated_at: None,
            vendor_notes: None,
            admin_notes: None,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total quantity across all line items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Applies a status update, stamping the matching milestone.
    ///
    /// Guarded mode checks the transition table; Force applies any status.
    /// Exactly one milestone is stamped per status that has one, and a
    /// milestone is only written once.
    pub fn apply_status(
        &mut self,
        new_status: OrderStatus,
        mode: TransitionMode,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if mode == TransitionMode::Guarded && !self.status.can_transition_to(new_status) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: new_status,
            });
        }

        self.status = new_status;
        self.stamp_milestone(new_status, now);
        self.updated_at = now;
        Ok(())
    }

    fn stamp_milestone(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        let slot = match status {
            OrderStatus::Confirmed => &mut self.confirmed_at,
            OrderStatus::Shipped => &mut self.shipped_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Cancelled => &mut self.cancelled_at,
            OrderStatus::Refunded => &mut self.refunded_at,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(now);
        }
    }

    /// Cancels the order.
    ///
    /// Rejected when already cancelled or post-shipment; the reason lands
    /// in `admin_notes`.
    pub fn cancel(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled);
        }
        if self.status.blocks_cancellation() {
            return Err(OrderError::CannotCancel {
                status: self.status,
            });
        }

        self.status = OrderStatus::Cancelled;
        self.stamp_milestone(OrderStatus::Cancelled, now);
        self.admin_notes = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// Requests a return for a delivered order.
    ///
    /// Only the owning user may request one, and duplicates are rejected
    /// rather than merged.
    pub fn request_return(
        &mut self,
        requested_by: UserId,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.status != OrderStatus::Delivered {
            return Err(OrderError::ReturnNotEligible {
                status: self.status,
            });
        }
        if requested_by != self.user_id {
            return Err(OrderError::NotOrderOwner);
        }
        if self.return_requested {
            return Err(OrderError::ReturnAlreadyRequested);
        }

        self.return_requested = true;
        self.return_reason = Some(reason.into());
        self.return_requested_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Escalates the order to the administrative channel.
    pub fn escalate(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.escalated {
            return Err(OrderError::AlreadyEscalated);
        }

        self.escalated = true;
        self.escalation_reason = Some(reason.into());
        self.escalated_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Moves the payment into PROCESSING.
    pub fn begin_payment(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.payment_status.can_begin() {
            return Err(OrderError::InvalidPaymentTransition {
                from: self.payment_status,
            });
        }

        self.payment_status = PaymentStatus::Processing;
        self.updated_at = now;
        Ok(())
    }

    /// Settles a processing payment.
    ///
    /// Idempotent: settling an already-settled payment with the same
    /// outcome is a no-op and returns `false`.
    pub fn settle_payment(
        &mut self,
        outcome: PaymentOutcome,
        now: DateTime<Utc>,
    ) -> Result<bool, OrderError> {
        let target = match outcome {
            PaymentOutcome::Succeeded => PaymentStatus::Completed,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        };

        if self.payment_status == target {
            return Ok(false);
        }
        if !self.payment_status.can_settle() {
            return Err(OrderError::InvalidPaymentTransition {
                from: self.payment_status,
            });
        }

        self.payment_status = target;
        self.updated_at = now;
        Ok(true)
    }

    /// Refunds a completed payment, fully or partially.
    pub fn refund_payment(
        &mut self,
        scope: RefundScope,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.payment_status.can_refund() {
            return Err(OrderError::InvalidPaymentTransition {
                from: self.payment_status,
            });
        }

        self.payment_status = match scope {
            RefundScope::Full => PaymentStatus::Refunded,
            RefundScope::Partial => PaymentStatus::PartiallyRefunded,
        };
        self.updated_at = now;
        Ok(())
    }
}
