//! Shopping cart and order totals.
//!
//! A [`Cart`] is a list of variant lines held in the visitor's session. Its
//! totals follow one formula everywhere (cart page, checkout review, placed
//! order, CLI quote):
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! tax      = round(tax_rate × subtotal)
//! total    = subtotal + shipping + tax − discount
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, Variant};
use crate::types::{ProductId, VariantId, round_cents};

/// Maximum quantity of one variant on a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Errors from cart mutations. Messages are shown to shoppers as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("That item is no longer in your cart")]
    UnknownItem(VariantId),
    #[error("That product is not available")]
    Unavailable,
    #[error("{name} is out of stock")]
    OutOfStock { name: String },
    #[error("Only {available} of {name} available")]
    InsufficientStock { name: String, available: u32 },
    #[error("Quantity must be between 1 and {max}")]
    InvalidQuantity { max: u32 },
}

/// A change [`Cart::reconcile`] made to bring a line in line with the
/// catalog. Messages are shown to shoppers as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    #[error("{name} is no longer available and was removed from your cart.")]
    Removed { name: String },
    #[error("Only {available} of {name} left, so the quantity was reduced.")]
    QuantityReduced { name: String, available: u32 },
    #[error("The price of {name} has changed.")]
    PriceChanged { name: String },
}

/// One line of the cart: a product variant, its price at add time and a
/// quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub slug: String,
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image: Option<String>,
}

impl CartItem {
    fn new(product: &Product, variant: &Variant, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            variant_id: variant.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            variant_label: variant.label(),
            unit_price: product.effective_price(),
            quantity,
            image: product.primary_image().map(str::to_owned),
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    /// Normalized code of the applied coupon, re-validated on every quote.
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl Cart {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Σ unit price × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn line(&self, variant_id: VariantId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.variant_id == variant_id)
    }

    /// Add `quantity` of a variant, merging with an existing line.
    ///
    /// The resulting line quantity is capped at [`MAX_LINE_QUANTITY`] and at
    /// the variant's stock. Returns the line quantity after the add.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the product is inactive, the variant does not
    /// belong to it, the variant has no stock, or `quantity` is out of range.
    pub fn add(
        &mut self,
        product: &Product,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<u32, CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidQuantity {
                max: MAX_LINE_QUANTITY,
            });
        }
        if !product.is_active() {
            return Err(CartError::Unavailable);
        }
        let variant = product.variant(variant_id).ok_or(CartError::Unavailable)?;
        if variant.stock == 0 {
            return Err(CartError::OutOfStock {
                name: product.name.clone(),
            });
        }

        let limit = MAX_LINE_QUANTITY.min(variant.stock);
        if let Some(line) = self.items.iter_mut().find(|i| i.variant_id == variant_id) {
            line.quantity = line.quantity.saturating_add(quantity).min(limit);
            line.unit_price = product.effective_price();
            Ok(line.quantity)
        } else {
            let line = CartItem::new(product, variant, quantity.min(limit));
            let added = line.quantity;
            self.items.push(line);
            Ok(added)
        }
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownItem`] if the variant is not in the cart,
    /// [`CartError::InvalidQuantity`] above [`MAX_LINE_QUANTITY`], or
    /// [`CartError::InsufficientStock`] when `available` is lower.
    pub fn set_quantity(
        &mut self,
        variant_id: VariantId,
        quantity: u32,
        available: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(variant_id).map(|_| ());
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity {
                max: MAX_LINE_QUANTITY,
            });
        }
        let line = self
            .items
            .iter_mut()
            .find(|i| i.variant_id == variant_id)
            .ok_or(CartError::UnknownItem(variant_id))?;
        if quantity > available {
            return Err(CartError::InsufficientStock {
                name: line.name.clone(),
                available,
            });
        }
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownItem`] if the variant is not in the cart.
    pub fn remove(&mut self, variant_id: VariantId) -> Result<CartItem, CartError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.variant_id == variant_id)
            .ok_or(CartError::UnknownItem(variant_id))?;
        Ok(self.items.remove(pos))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
    }

    /// Bring lines in line with the current catalog: refresh prices, clamp
    /// quantities to stock and drop lines whose product is gone, inactive
    /// or sold out. Returns every change made, empty when the cart already
    /// matched.
    pub fn reconcile(&mut self, products: &[Product]) -> Vec<CartChange> {
        let mut changes = Vec::new();
        self.items.retain_mut(|line| {
            let current = products
                .iter()
                .find(|p| p.id == line.product_id && p.is_active())
                .and_then(|p| p.variant(line.variant_id).map(|v| (p, v)));
            let Some((product, variant)) = current.filter(|(_, v)| v.stock > 0) else {
                changes.push(CartChange::Removed {
                    name: line.name.clone(),
                });
                return false;
            };
            let price = product.effective_price();
            if line.unit_price != price {
                line.unit_price = price;
                changes.push(CartChange::PriceChanged {
                    name: line.name.clone(),
                });
            }
            if line.quantity > variant.stock {
                line.quantity = variant.stock;
                changes.push(CartChange::QuantityReduced {
                    name: line.name.clone(),
                    available: variant.stock,
                });
            }
            true
        });
        changes
    }
}

/// Shipping speed chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

impl ShippingMethod {
    pub const ALL: [Self; 2] = [Self::Standard, Self::Express];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard (5-7 business days)",
            Self::Express => "Express (1-2 business days)",
        }
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("invalid shipping method: {s}"))
    }
}

/// Store-wide pricing inputs, derived from the store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Fraction, e.g. `0.08` for 8%.
    pub tax_rate: Decimal,
    pub standard_shipping: Decimal,
    pub express_shipping: Decimal,
    /// Subtotal at or above which standard shipping is free.
    pub free_shipping_threshold: Option<Decimal>,
}

impl PricingPolicy {
    /// Shipping charge for a cart with this (pre-discount) subtotal.
    #[must_use]
    pub fn shipping_cost(&self, subtotal: Decimal, method: ShippingMethod) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match method {
            ShippingMethod::Standard
                if self.free_shipping_threshold.is_some_and(|t| subtotal >= t) =>
            {
                Decimal::ZERO
            }
            ShippingMethod::Standard => self.standard_shipping,
            ShippingMethod::Express => self.express_shipping,
        }
    }

    /// How much more the shopper must spend to reach free shipping.
    #[must_use]
    pub fn remaining_for_free_shipping(&self, subtotal: Decimal) -> Option<Decimal> {
        self.free_shipping_threshold
            .filter(|t| subtotal < *t)
            .map(|t| t - subtotal)
    }
}

/// Computed totals for a cart, checkout or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Compute totals. `discount` is clamped to `[0, subtotal]` so the total
    /// never goes negative.
    #[must_use]
    pub fn compute(
        subtotal: Decimal,
        discount: Decimal,
        method: ShippingMethod,
        policy: &PricingPolicy,
    ) -> Self {
        let subtotal = subtotal.max(Decimal::ZERO);
        let discount = round_cents(discount.clamp(Decimal::ZERO, subtotal));
        let shipping = policy.shipping_cost(subtotal, method);
        let tax = round_cents(policy.tax_rate * subtotal);
        let total = subtotal + shipping + tax - discount;

        Self {
            subtotal,
            shipping,
            tax,
            discount,
            total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::tests::{d, product};
    use crate::types::ProductStatus;

    fn policy() -> PricingPolicy {
        PricingPolicy {
            tax_rate: d("0.08"),
            standard_shipping: d("5.99"),
            express_shipping: d("14.99"),
            free_shipping_threshold: Some(d("75")),
        }
    }

    #[test]
    fn test_subtotal_is_sum_of_price_times_quantity() {
        let a = product(1, "Tote", 1, "12.50");
        let b = product(2, "Mug", 1, "8.25");
        let mut cart = Cart::default();
        cart.add(&a, VariantId::new(10), 3).unwrap();
        cart.add(&b, VariantId::new(20), 2).unwrap();

        assert_eq!(cart.subtotal(), d("12.50") * d("3") + d("8.25") * d("2"));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_merges_and_caps_at_stock() {
        let p = product(1, "Tote", 1, "10");
        let mut cart = Cart::default();
        assert_eq!(cart.add(&p, VariantId::new(10), 3).unwrap(), 3);
        assert_eq!(cart.add(&p, VariantId::new(10), 4).unwrap(), 5);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_add_uses_effective_price() {
        let mut p = product(1, "Tote", 1, "10");
        p.discount_price = Some(d("7.5"));
        let mut cart = Cart::default();
        cart.add(&p, VariantId::new(10), 1).unwrap();
        assert_eq!(cart.items[0].unit_price, d("7.5"));
    }

    #[test]
    fn test_add_rejections() {
        let mut p = product(1, "Tote", 1, "10");
        let mut cart = Cart::default();
        assert_eq!(
            cart.add(&p, VariantId::new(10), 0),
            Err(CartError::InvalidQuantity { max: MAX_LINE_QUANTITY })
        );
        assert_eq!(
            cart.add(&p, VariantId::new(99), 1),
            Err(CartError::Unavailable)
        );
        p.variants[0].stock = 0;
        assert!(matches!(
            cart.add(&p, VariantId::new(10), 1),
            Err(CartError::OutOfStock { .. })
        ));
        p.status = ProductStatus::Draft;
        assert_eq!(
            cart.add(&p, VariantId::new(10), 1),
            Err(CartError::Unavailable)
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let p = product(1, "Tote", 1, "10");
        let mut cart = Cart::default();
        cart.add(&p, VariantId::new(10), 1).unwrap();

        cart.set_quantity(VariantId::new(10), 4, 5).unwrap();
        assert_eq!(cart.item_count(), 4);
        assert!(matches!(
            cart.set_quantity(VariantId::new(10), 6, 5),
            Err(CartError::InsufficientStock { available: 5, .. })
        ));
        cart.set_quantity(VariantId::new(10), 0, 5).unwrap();
        assert!(cart.is_empty());
        assert_eq!(
            cart.remove(VariantId::new(10)),
            Err(CartError::UnknownItem(VariantId::new(10)))
        );
    }

    #[test]
    fn test_reconcile_drops_missing_and_reprices() {
        let mut a = product(1, "Tote", 1, "10");
        let b = product(2, "Mug", 1, "8");
        let mut cart = Cart::default();
        cart.add(&a, VariantId::new(10), 4).unwrap();
        cart.add(&b, VariantId::new(20), 1).unwrap();

        a.price = d("12");
        a.variants[0].stock = 2;
        let changes = cart.reconcile(&[a.clone()]);

        assert_eq!(
            changes,
            vec![
                CartChange::PriceChanged {
                    name: "Tote".to_owned()
                },
                CartChange::QuantityReduced {
                    name: "Tote".to_owned(),
                    available: 2
                },
                CartChange::Removed {
                    name: "Mug".to_owned()
                },
            ]
        );
        assert_eq!(cart.items[0].unit_price, d("12"));
        assert_eq!(cart.items[0].quantity, 2);

        assert!(cart.reconcile(&[a]).is_empty());
    }

    #[test]
    fn test_totals_formula() {
        let totals = CartTotals::compute(d("50"), d("5"), ShippingMethod::Standard, &policy());
        assert_eq!(totals.shipping, d("5.99"));
        assert_eq!(totals.tax, d("4.00"));
        assert_eq!(totals.total, d("50") + d("5.99") + d("4") - d("5"));
    }

    #[test]
    fn test_free_standard_shipping_over_threshold() {
        let totals = CartTotals::compute(d("80"), d("0"), ShippingMethod::Standard, &policy());
        assert_eq!(totals.shipping, d("0"));
        let express = CartTotals::compute(d("80"), d("0"), ShippingMethod::Express, &policy());
        assert_eq!(express.shipping, d("14.99"));
        assert_eq!(policy().remaining_for_free_shipping(d("60")), Some(d("15")));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = CartTotals::compute(d("0"), d("10"), ShippingMethod::Express, &policy());
        assert_eq!(totals.total, d("0"));
        assert_eq!(totals.discount, d("0"));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let totals = CartTotals::compute(d("20"), d("30"), ShippingMethod::Standard, &policy());
        assert_eq!(totals.discount, d("20"));
        assert_eq!(totals.total, totals.shipping + totals.tax);
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        let totals = CartTotals::compute(d("19.99"), d("0"), ShippingMethod::Standard, &policy());
        assert_eq!(totals.tax, d("1.60"));
    }
}
