//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{ProductId, VendorId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

/// One line of an order.
///
/// `product_name` and `unit_price` are snapshots taken at creation time;
/// later catalog edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Always `quantity * unit_price`; stored so the row is self-describing.
    pub total_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<VendorId>,
}

impl LineItem {
    /// Creates a new line item, computing the line total.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
        vendor_id: Option<VendorId>,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            total_price: unit_price.multiply(quantity),
            vendor_id,
        }
    }
}

/// The monetary breakdown of an order.
///
/// Invariant: `total_amount = subtotal + tax + shipping - discount`. The
/// constructor computes the total; [`OrderAmounts::is_consistent`] re-checks
/// rows loaded from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmounts {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl OrderAmounts {
    /// Builds amounts from the parts, computing the total.
    pub fn from_parts(subtotal: Money, tax: Money, shipping: Money, discount: Money) -> Self {
        Self {
            subtotal,
            tax_amount: tax,
            shipping_amount: shipping,
            discount_amount: discount,
            total_amount: subtotal + tax + shipping - discount,
        }
    }

    /// Returns true if the stored total matches the identity.
    pub fn is_consistent(&self) -> bool {
        self.total_amount
            == self.subtotal + self.tax_amount + self.shipping_amount - self.discount_amount
    }
}

/// Where the order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

/// Human-readable order number, e.g. `ORD-20260805-1A2B3C`.
///
/// Generation is random-suffixed and therefore not collision-free; the
/// repository enforces uniqueness and callers retry generation on conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh candidate order number.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "ORD-{}-{}",
            now.format("%Y%m%d"),
            suffix[..6].to_uppercase()
        ))
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
    }

    #[test]
    fn test_line_item_total_price() {
        let item = LineItem::new(ProductId::new(), "Widget", 3, Money::from_cents(1000), None);
        assert_eq!(item.total_price.cents(), 3000);
    }

    #[test]
    fn test_amounts_identity() {
        let amounts = OrderAmounts::from_parts(
            Money::from_cents(2500),
            Money::from_cents(200),
            Money::from_cents(500),
            Money::from_cents(300),
        );
        assert_eq!(amounts.total_amount.cents(), 2900);
        assert!(amounts.is_consistent());

        let mut broken = amounts;
        broken.total_amount = Money::from_cents(1);
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_order_number_shape() {
        let now = Utc::now();
        let number = OrderNumber::generate(now);
        let s = number.as_str();
        assert!(s.starts_with("ORD-"));
        // ORD- + 8 date digits + dash + 6 suffix chars
        assert_eq!(s.len(), 4 + 8 + 1 + 6);
    }

    #[test]
    fn test_order_numbers_differ() {
        let now = Utc::now();
        assert_ne!(OrderNumber::generate(now), OrderNumber::generate(now));
    }

    #[test]
    fn test_line_item_serialization() {
        let item = LineItem::new(
            ProductId::new(),
            "Widget",
            2,
            Money::from_cents(999),
            Some(VendorId::new()),
        );
        let json = serde_json::to_string(&item).unwrap();
        let deserialized: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, deserialized);
    }
}
