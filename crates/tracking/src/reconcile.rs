//! Reconciliation policy: tracking status to order status.

use domain::OrderStatus;

use crate::entry::TrackingStatus;

/// Maps a tracking-event status onto the order's canonical status.
///
/// The collapse is intentionally lossy: the ledger keeps the finer
/// carrier-level sub-state (OUT_FOR_DELIVERY, RETURNED, REFUNDED) while the
/// order converges on the coarser state its consumers act on. This table is
/// the single point where the two status domains meet.
pub fn order_status_for(status: TrackingStatus) -> OrderStatus {
    match status {
        TrackingStatus::Pending => OrderStatus::Pending,
        TrackingStatus::Confirmed | TrackingStatus::Processing => OrderStatus::Processing,
        TrackingStatus::Shipped | TrackingStatus::OutForDelivery => OrderStatus::Shipped,
        TrackingStatus::Delivered => OrderStatus::Delivered,
        TrackingStatus::Cancelled | TrackingStatus::Returned | TrackingStatus::Refunded => {
            OrderStatus::Cancelled
        }
    }
}
