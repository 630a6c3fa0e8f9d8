//! Stock record and its derived state.

use chrono::{DateTime, Utc};
use common::{InventoryId, ProductId, UserId, VendorId};
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Maximum number of audit entries kept per record; oldest drop first.
pub const HISTORY_CAP: usize = 100;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovementKind {
    /// Receive stock: adds to the current level.
    In,
    /// Remove stock: subtracts, guarded against going negative.
    Out,
    /// Set the current level to an absolute value.
    Adjustment,
}

impl StockMovementKind {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockMovementKind::In => "IN",
            StockMovementKind::Out => "OUT",
            StockMovementKind::Adjustment => "ADJUSTMENT",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(StockMovementKind::In),
            "OUT" => Some(StockMovementKind::Out),
            "ADJUSTMENT" => Some(StockMovementKind::Adjustment),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockMovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit entry in the bounded stock history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub at: DateTime<Utc>,
    pub quantity: u32,
    pub kind: StockMovementKind,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A requested mutation of the current stock level.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub quantity: u32,
    pub kind: StockMovementKind,
    pub reason: String,
    pub reference: Option<String>,
    pub actor: UserId,
}

/// Fields for creating a stock record.
#[derive(Debug, Clone)]
pub struct NewStockRecord {
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub current_stock: u32,
    pub reserved_stock: u32,
    pub low_stock_threshold: u32,
    pub stock_notes: Option<String>,
    pub created_by: UserId,
}

/// The stock record for one (product, vendor) pair.
///
/// `available_stock`, `is_out_of_stock`, and `is_low_stock` are derived
/// from the other fields and always recomputed together; nothing sets them
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub vendor_id: VendorId,

    pub current_stock: u32,
    pub reserved_stock: u32,
    pub available_stock: u32,
    pub is_out_of_stock: bool,
    pub is_low_stock: bool,
    pub low_stock_threshold: u32,

    pub last_stock_update: Option<DateTime<Utc>>,
    pub last_low_stock_alert: Option<DateTime<Utc>>,
    pub stock_notes: Option<String>,

    /// Chronological audit trail, capped at [`HISTORY_CAP`] entries.
    pub stock_history: Vec<StockMovement>,

    pub created_by: UserId,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Builds a fresh record, deriving the availability flags.
    pub fn new(fields: NewStockRecord, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            id: InventoryId::new(),
            product_id: fields.product_id,
            vendor_id: fields.vendor_id,
            current_stock: fields.current_stock,
            reserved_stock: fields.reserved_stock,
            available_stock: 0,
            is_out_of_stock: false,
            is_low_stock: false,
            low_stock_threshold: fields.low_stock_threshold,
            last_stock_update: None,
            last_low_stock_alert: None,
            stock_notes: fields.stock_notes,
            stock_history: Vec::new(),
            created_by: fields.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        record.recompute();
        record
    }

    /// Recomputes the derived availability values.
    ///
    /// `available = max(0, current - reserved)`; out-of-stock means nothing
    /// is available; low-stock means available but at or under the
    /// threshold.
    pub fn recompute(&mut self) {
        self.available_stock = self.current_stock.saturating_sub(self.reserved_stock);
        self.is_out_of_stock = self.available_stock == 0;
        self.is_low_stock =
            self.available_stock > 0 && self.available_stock <= self.low_stock_threshold;
    }

    /// Applies an adjustment: mutates the current level, recomputes the
    /// derived flags, and appends an audit entry.
    ///
    /// Returns true if the record crossed into low-stock with this
    /// adjustment (the caller dispatches the alert).
    pub fn apply(
        &mut self,
        adjustment: &StockAdjustment,
        now: DateTime<Utc>,
    ) -> Result<bool, InventoryError> {
        match adjustment.kind {
            StockMovementKind::In => {
                self.current_stock = self.current_stock.saturating_add(adjustment.quantity);
            }
            StockMovementKind::Out => {
                if adjustment.quantity > self.current_stock {
                    return Err(InventoryError::InsufficientStock {
                        requested: adjustment.quantity,
                        on_hand: self.current_stock,
                    });
                }
                self.current_stock -= adjustment.quantity;
            }
            StockMovementKind::Adjustment => {
                self.current_stock = adjustment.quantity;
            }
        }

        let was_low = self.is_low_stock;
        self.recompute();

        self.stock_history.push(StockMovement {
            at: now,
            quantity: adjustment.quantity,
            kind: adjustment.kind,
            reason: adjustment.reason.clone(),
            reference: adjustment.reference.clone(),
        });
        if self.stock_history.len() > HISTORY_CAP {
            let excess = self.stock_history.len() - HISTORY_CAP;
            self.stock_history.drain(..excess);
        }

        self.last_stock_update = Some(now);
        self.updated_by = Some(adjustment.actor);
        self.updated_at = now;

        let crossed_into_low = !was_low && self.is_low_stock;
        if crossed_into_low {
            self.last_low_stock_alert = Some(now);
        }
        Ok(crossed_into_low)
    }

    /// Overwrites the levels from a bulk-import row and recomputes.
    pub fn apply_import(
        &mut self,
        current_stock: u32,
        reserved_stock: u32,
        low_stock_threshold: u32,
        stock_notes: Option<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) {
        self.current_stock = current_stock;
        self.reserved_stock = reserved_stock;
        self.low_stock_threshold = low_stock_threshold;
        if stock_notes.is_some() {
            self.stock_notes = stock_notes;
        }
        self.recompute();
        self.last_stock_update = Some(now);
        self.updated_by = Some(actor);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(current: u32, reserved: u32, threshold: u32) -> StockRecord {
        StockRecord::new(
            NewStockRecord {
                product_id: ProductId::new(),
                vendor_id: VendorId::new(),
                current_stock: current,
                reserved_stock: reserved,
                low_stock_threshold: threshold,
                stock_notes: None,
                created_by: UserId::new(),
            },
            Utc::now(),
        )
    }

    fn out(quantity: u32) -> StockAdjustment {
        StockAdjustment {
            quantity,
            kind: StockMovementKind::Out,
            reason: "sale".to_string(),
            reference: None,
            actor: UserId::new(),
        }
    }

    #[test]
    fn test_derivation_invariant() {
        // (current, reserved, threshold) -> (available, out, low)
        let cases = [
            (0, 0, 0, 0, true, false),
            (10, 0, 0, 10, false, false),
            (10, 4, 5, 6, false, false),
            (10, 5, 5, 5, false, true),
            (10, 10, 5, 0, true, false),
            (5, 9, 5, 0, true, false), // reserved above current saturates
            (3, 0, 20, 3, false, true),
        ];
        for (current, reserved, threshold, available, is_out, is_low) in cases {
            let r = record(current, reserved, threshold);
            assert_eq!(r.available_stock, available, "case {current}/{reserved}");
            assert_eq!(r.is_out_of_stock, is_out, "case {current}/{reserved}");
            assert_eq!(r.is_low_stock, is_low, "case {current}/{reserved}");
        }
    }

    #[test]
    fn test_out_guard_leaves_stock_unchanged() {
        let mut r = record(10, 0, 5);
        let result = r.apply(&out(11), Utc::now());
        assert!(matches!(
            result,
            Err(InventoryError::InsufficientStock {
                requested: 11,
                on_hand: 10,
            })
        ));
        assert_eq!(r.current_stock, 10);
        assert!(r.stock_history.is_empty());
    }

    #[test]
    fn test_adjustment_sets_absolute_level() {
        let mut r = record(10, 0, 5);
        r.apply(
            &StockAdjustment {
                quantity: 42,
                kind: StockMovementKind::Adjustment,
                reason: "cycle count".to_string(),
                reference: Some("CC-9".to_string()),
                actor: UserId::new(),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(r.current_stock, 42);
        assert_eq!(r.available_stock, 42);
        assert_eq!(r.stock_history.len(), 1);
        assert_eq!(r.stock_history[0].reference.as_deref(), Some("CC-9"));
    }

    #[test]
    fn test_history_bounded_to_cap() {
        let mut r = record(1000, 0, 0);
        let start = Utc::now();
        for i in 0..150u32 {
            let at = start + chrono::Duration::seconds(i as i64);
            r.apply(
                &StockAdjustment {
                    quantity: 1,
                    kind: StockMovementKind::In,
                    reason: format!("batch {i}"),
                    reference: None,
                    actor: UserId::new(),
                },
                at,
            )
            .unwrap();
        }

        assert_eq!(r.stock_history.len(), HISTORY_CAP);
        // The 100 most recent entries, oldest first.
        assert_eq!(r.stock_history[0].reason, "batch 50");
        assert_eq!(r.stock_history[HISTORY_CAP - 1].reason, "batch 149");
        assert!(
            r.stock_history
                .windows(2)
                .all(|pair| pair[0].at <= pair[1].at)
        );
    }

    #[test]
    fn test_low_stock_crossing_reported_once() {
        // 100 on hand, threshold 20.
        let mut r = record(100, 0, 20);

        let crossed = r.apply(&out(85), Utc::now()).unwrap();
        assert!(crossed);
        assert_eq!(r.available_stock, 15);
        assert!(r.is_low_stock);
        assert!(!r.is_out_of_stock);
        assert!(r.last_low_stock_alert.is_some());

        // Still low after a further draw-down, but no new crossing.
        let crossed = r.apply(&out(5), Utc::now()).unwrap();
        assert!(!crossed);

        let crossed = r.apply(&out(10), Utc::now()).unwrap();
        assert!(!crossed);
        assert_eq!(r.available_stock, 0);
        assert!(r.is_out_of_stock);
        assert!(!r.is_low_stock);
    }

    #[test]
    fn test_apply_import_overwrites_and_recomputes() {
        let mut r = record(10, 0, 5);
        let actor = UserId::new();
        r.apply_import(3, 1, 4, Some("restock pending".to_string()), actor, Utc::now());

        assert_eq!(r.current_stock, 3);
        assert_eq!(r.reserved_stock, 1);
        assert_eq!(r.available_stock, 2);
        assert!(r.is_low_stock);
        assert_eq!(r.stock_notes.as_deref(), Some("restock pending"));
        assert_eq!(r.updated_by, Some(actor));
    }

    #[test]
    fn test_kind_wire_roundtrip() {
        for kind in [
            StockMovementKind::In,
            StockMovementKind::Out,
            StockMovementKind::Adjustment,
        ] {
            assert_eq!(StockMovementKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(StockMovementKind::parse("SIDEWAYS"), None);
    }
}
