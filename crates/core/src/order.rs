//! Placed orders, addresses and the tracking timeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::ShippingMethod;
use crate::types::{
    OrderId, OrderStatus, PaymentStatus, ProductId, TransitionError, UserId, VariantId,
};

/// Prefix of human-facing order numbers, e.g. `HP-1042`.
pub const ORDER_NUMBER_PREFIX: &str = "HP-";

const FIRST_ORDER_NUMBER: u32 = 1001;

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Printable lines, e.g. for the confirmation page.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.full_name(), self.line1.clone()];
        if let Some(line2) = self.line2.as_ref().filter(|l| !l.is_empty()) {
            lines.push(line2.clone());
        }
        lines.push(format!("{}, {} {}", self.city, self.region, self.postal_code));
        lines.push(self.country.clone());
        lines
    }
}

/// What is kept of the card used at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub brand: String,
    pub last4: String,
}

impl PaymentSummary {
    /// "Visa ending in 4242".
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} ending in {}", self.brand, self.last4)
    }
}

/// One line of a placed order, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    #[serde(default)]
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub email: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    pub payment: PaymentSummary,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One step of the tracking timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineStep {
    pub status: OrderStatus,
    pub reached: bool,
    pub current: bool,
}

impl Order {
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Whether `email` is the address the order was placed with.
    #[must_use]
    pub fn placed_by(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }

    /// Forward timeline with reached/current flags. Empty for cancelled
    /// orders, which have no position on it.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineStep> {
        let Some(position) = self.status.timeline_position() else {
            return Vec::new();
        };
        OrderStatus::TIMELINE
            .iter()
            .enumerate()
            .map(|(i, status)| TimelineStep {
                status: *status,
                reached: i <= position,
                current: i == position,
            })
            .collect()
    }

    /// Move the order to `next`.
    ///
    /// Cancelling a paid order marks the payment refunded. Shipping requires
    /// a tracking number, which is assigned from `tracking_number` if none is
    /// set yet.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if `next` is not reachable.
    pub fn apply_status(
        &mut self,
        next: OrderStatus,
        tracking_number: impl FnOnce() -> String,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.transition(next)?;
        match next {
            OrderStatus::Cancelled if self.payment_status == PaymentStatus::Paid => {
                self.payment_status = PaymentStatus::Refunded;
            }
            OrderStatus::Shipped if self.tracking_number.is_none() => {
                self.tracking_number = Some(tracking_number());
            }
            _ => {}
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Next sequential order number after the highest existing one, or `None`
/// once the highest is the last number that fits.
#[must_use]
pub fn next_order_number(orders: &[Order]) -> Option<String> {
    let highest = orders
        .iter()
        .filter_map(|o| o.number.strip_prefix(ORDER_NUMBER_PREFIX)?.parse::<u32>().ok())
        .max();
    let next = match highest {
        Some(n) => n.checked_add(1)?,
        None => FIRST_ORDER_NUMBER,
    };
    Some(format!("{ORDER_NUMBER_PREFIX}{next}"))
}

/// Normalize a shopper-typed order number ("hp 1042", "#HP-1042", "1042").
#[must_use]
pub fn normalize_order_number(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    format!("{ORDER_NUMBER_PREFIX}{digits}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::tests::d;
    use chrono::TimeZone;

    pub(crate) fn order(number: &str, status: OrderStatus) -> Order {
        let placed_at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Order {
            id: OrderId::new(1),
            number: number.to_owned(),
            user_id: None,
            email: "ana@example.com".to_owned(),
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                variant_id: VariantId::new(10),
                name: "Tote".to_owned(),
                variant_label: None,
                unit_price: d("20"),
                quantity: 2,
            }],
            shipping_address: Address::default(),
            shipping_method: ShippingMethod::Standard,
            payment: PaymentSummary {
                brand: "Visa".to_owned(),
                last4: "4242".to_owned(),
            },
            coupon_code: None,
            subtotal: d("40"),
            shipping: d("5.99"),
            tax: d("3.20"),
            discount: d("0"),
            total: d("49.19"),
            status,
            payment_status: PaymentStatus::Paid,
            tracking_number: None,
            placed_at,
            updated_at: placed_at,
        }
    }

    #[test]
    fn test_next_order_number() {
        assert_eq!(next_order_number(&[]).as_deref(), Some("HP-1001"));
        let orders = vec![
            order("HP-1007", OrderStatus::Pending),
            order("HP-1003", OrderStatus::Pending),
        ];
        assert_eq!(next_order_number(&orders).as_deref(), Some("HP-1008"));
    }

    #[test]
    fn test_next_order_number_stops_at_the_last() {
        let last = format!("HP-{}", u32::MAX);
        let orders = vec![order(&last, OrderStatus::Pending)];
        assert_eq!(next_order_number(&orders), None);

        let orders = vec![order(&format!("HP-{}", u32::MAX - 1), OrderStatus::Pending)];
        assert_eq!(next_order_number(&orders), Some(last));
    }

    #[test]
    fn test_normalize_order_number() {
        assert_eq!(normalize_order_number("#hp 1042"), "HP-1042");
        assert_eq!(normalize_order_number("1042"), "HP-1042");
    }

    #[test]
    fn test_timeline_marks_current_step() {
        let o = order("HP-1001", OrderStatus::Shipped);
        let timeline = o.timeline();
        assert_eq!(timeline.len(), 4);
        assert!(timeline[2].reached && timeline[2].current);
        assert!(!timeline[3].reached);
        assert!(order("HP-1001", OrderStatus::Cancelled).timeline().is_empty());
    }

    #[test]
    fn test_ship_assigns_tracking_number() {
        let now = Utc::now();
        let mut o = order("HP-1001", OrderStatus::Processing);
        o.apply_status(OrderStatus::Shipped, || "1Z999".to_owned(), now)
            .unwrap();
        assert_eq!(o.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(o.updated_at, now);
    }

    #[test]
    fn test_cancel_refunds_paid_order() {
        let mut o = order("HP-1001", OrderStatus::Pending);
        o.apply_status(OrderStatus::Cancelled, String::new, Utc::now())
            .unwrap();
        assert_eq!(o.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_invalid_transition_leaves_order_untouched() {
        let mut o = order("HP-1001", OrderStatus::Delivered);
        let before = o.clone();
        assert!(
            o.apply_status(OrderStatus::Pending, String::new, Utc::now())
                .is_err()
        );
        assert_eq!(o, before);
    }

    #[test]
    fn test_placed_by_ignores_case() {
        let o = order("HP-1001", OrderStatus::Pending);
        assert!(o.placed_by(" ANA@example.com"));
        assert_eq!(o.item_count(), 2);
    }
}
