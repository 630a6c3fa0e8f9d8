//! Tracking ledger entries.

use chrono::{DateTime, Utc};
use common::{OrderId, TrackingEntryId, UserId};
use serde::{Deserialize, Serialize};

/// Status recorded on a tracking event.
///
/// Finer grained than the order status: the ledger keeps the carrier-level
/// sub-states and the reconciliation mapping collapses them onto the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

impl TrackingStatus {
    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Pending => "PENDING",
            TrackingStatus::Confirmed => "CONFIRMED",
            TrackingStatus::Processing => "PROCESSING",
            TrackingStatus::Shipped => "SHIPPED",
            TrackingStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            TrackingStatus::Delivered => "DELIVERED",
            TrackingStatus::Cancelled => "CANCELLED",
            TrackingStatus::Returned => "RETURNED",
            TrackingStatus::Refunded => "REFUNDED",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TrackingStatus::Pending),
            "CONFIRMED" => Some(TrackingStatus::Confirmed),
            "PROCESSING" => Some(TrackingStatus::Processing),
            "SHIPPED" => Some(TrackingStatus::Shipped),
            "OUT_FOR_DELIVERY" => Some(TrackingStatus::OutForDelivery),
            "DELIVERED" => Some(TrackingStatus::Delivered),
            "CANCELLED" => Some(TrackingStatus::Cancelled),
            "RETURNED" => Some(TrackingStatus::Returned),
            "REFUNDED" => Some(TrackingStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields for recording a tracking event.
#[derive(Debug, Clone)]
pub struct NewTrackingEvent {
    pub order_id: OrderId,
    pub status: TrackingStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub created_by: UserId,
}

impl NewTrackingEvent {
    /// A bare event carrying only the status.
    pub fn status_only(order_id: OrderId, status: TrackingStatus, created_by: UserId) -> Self {
        Self {
            order_id,
            status,
            description: None,
            location: None,
            tracking_number: None,
            carrier: None,
            estimated_delivery: None,
            actual_delivery: None,
            created_by,
        }
    }
}

/// One immutable row in the tracking ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub id: TrackingEntryId,
    pub order_id: OrderId,
    pub status: TrackingStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    /// Flipped after the customer notification goes out; the only field
    /// that ever changes after append.
    pub is_notification_sent: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl TrackingEntry {
    /// Builds a fresh entry from an event, notification not yet sent.
    pub fn from_event(event: NewTrackingEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: TrackingEntryId::new(),
            order_id: event.order_id,
            status: event.status,
            description: event.description,
            location: event.location,
            tracking_number: event.tracking_number,
            carrier: event.carrier,
            estimated_delivery: event.estimated_delivery,
            actual_delivery: event.actual_delivery,
            is_notification_sent: false,
            notification_sent_at: None,
            created_by: event.created_by,
            created_at: now,
        }
    }
}
