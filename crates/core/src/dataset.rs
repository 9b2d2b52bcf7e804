//! The in-memory store dataset.
//!
//! Both web binaries seed a [`Dataset`] at startup, from the YAML document
//! embedded in this crate or from a file named in their configuration, and
//! keep it for the lifetime of the process. Relationships between records
//! are numeric ids resolved by linear search.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartChange, CartTotals, ShippingMethod};
use crate::catalog::{Category, Product, Variant};
use crate::checkout::{Checkout, CheckoutError, OrderMeta};
use crate::coupon::{Coupon, CouponError, DiscountKind, find_coupon};
use crate::order::{Order, next_order_number};
use crate::settings::StoreSettings;
use crate::types::{CategoryId, CouponId, OrderId, ProductId, UserId, VariantId, next_id};
use crate::user::User;

/// The embedded seed document.
pub const SEED_YAML: &str = include_str!("../data/seed.yaml");

/// Errors loading a dataset.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("invalid dataset document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("dataset failed {} integrity check(s): {}", .0.len(), .0.join("; "))]
    Integrity(Vec<String>),
}

/// Why an order could not be placed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(
        "Your cart changed since you reviewed it. {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    )]
    ItemsChanged(Vec<CartChange>),
    #[error("Coupon {code} was removed from your cart: {reason}")]
    CouponRemoved { code: String, reason: CouponError },
    #[error("No order numbers are left to assign")]
    NumbersExhausted,
}

/// All store records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub settings: StoreSettings,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

/// A cart priced against the current settings and coupons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub totals: CartTotals,
    /// The applied coupon, when the cart carries a code that is valid now.
    pub coupon: Option<Coupon>,
    /// Why the cart's coupon code does not apply.
    pub coupon_error: Option<CouponError>,
}

impl Dataset {
    /// Parse and check the embedded seed document.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the embedded document is malformed.
    pub fn seed() -> Result<Self, DatasetError> {
        Self::from_yaml(SEED_YAML)
    }

    /// Parse a dataset document and run the integrity checks.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Parse`] for malformed YAML and
    /// [`DatasetError::Integrity`] when references do not resolve.
    pub fn from_yaml(source: &str) -> Result<Self, DatasetError> {
        let dataset: Self = serde_yaml::from_str(source)?;
        let problems = dataset.integrity_errors();
        if problems.is_empty() {
            Ok(dataset)
        } else {
            Err(DatasetError::Integrity(problems))
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.slug == slug)
    }

    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn product_by_slug(&self, slug: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.slug == slug)
    }

    /// Active products in catalog order.
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.is_active())
    }

    /// Find a variant and the product it belongs to.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<(&Product, &Variant)> {
        self.products
            .iter()
            .find_map(|p| p.variant(id).map(|v| (p, v)))
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn order_by_number(&self, number: &str) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| o.number.eq_ignore_ascii_case(number.trim()))
    }

    /// Orders placed by a user (by account or by their email), newest first.
    #[must_use]
    pub fn orders_for_user(&self, user: &User) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user.id) || o.placed_by(&user.email))
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        orders
    }

    #[must_use]
    pub fn coupon(&self, id: CouponId) -> Option<&Coupon> {
        self.coupons.iter().find(|c| c.id == id)
    }

    // =========================================================================
    // Pricing & ordering
    // =========================================================================

    /// Price a cart: subtotal, shipping, tax and the cart's coupon, if it is
    /// valid at `now`.
    #[must_use]
    pub fn quote(&self, cart: &Cart, method: ShippingMethod, now: DateTime<Utc>) -> Quote {
        let subtotal = cart.subtotal();
        let (coupon, coupon_error, discount) = match cart.coupon_code.as_deref() {
            None => (None, None, Decimal::ZERO),
            Some(code) => match find_coupon(&self.coupons, code)
                .and_then(|c| c.discount_for(subtotal, now).map(|d| (c, d)))
            {
                Ok((c, discount)) => (Some(c.clone()), None, discount),
                Err(e) => (None, Some(e), Decimal::ZERO),
            },
        };
        let totals = CartTotals::compute(
            subtotal,
            discount,
            method,
            &self.settings.pricing_policy(),
        );
        Quote {
            totals,
            coupon,
            coupon_error,
        }
    }

    /// Place an order for a completed checkout.
    ///
    /// The cart is first reconciled with the catalog. If any line was
    /// dropped, re-priced or cut back to the stock left, or the cart's coupon
    /// no longer applies, the order is refused so the shopper can review the
    /// new cart before being charged.
    /// On success, variant stock is decremented, the coupon's usage count is
    /// incremented and the order is appended.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceOrderError`] if the cart changed, its coupon lapsed or
    /// checkout is incomplete. `cart` is left reconciled in the first two
    /// cases.
    pub fn place_order(
        &mut self,
        checkout: &Checkout,
        cart: &mut Cart,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Order, PlaceOrderError> {
        let changes = cart.reconcile(&self.products);
        if !changes.is_empty() {
            return Err(PlaceOrderError::ItemsChanged(changes));
        }

        let quote = self.quote(cart, checkout.shipping_method(), now);
        if let Some(reason) = quote.coupon_error {
            let code = cart.coupon_code.take().unwrap_or_default();
            return Err(PlaceOrderError::CouponRemoved { code, reason });
        }
        let meta = OrderMeta {
            id: next_id(self.orders.iter().map(|o| o.id)),
            number: next_order_number(&self.orders).ok_or(PlaceOrderError::NumbersExhausted)?,
            user_id,
            placed_at: now,
        };
        let order = checkout.build_order(cart, &quote.totals, meta)?;

        for item in &order.items {
            if let Some(variant) = self
                .products
                .iter_mut()
                .find(|p| p.id == item.product_id)
                .and_then(|p| p.variants.iter_mut().find(|v| v.id == item.variant_id))
            {
                variant.stock = variant.stock.saturating_sub(item.quantity);
            }
        }
        if let Some(coupon) = quote
            .coupon
            .and_then(|applied| self.coupons.iter_mut().find(|c| c.id == applied.id))
        {
            coupon.times_used += 1;
        }

        self.orders.push(order.clone());
        Ok(order)
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Every broken reference or invalid value in the dataset. Empty when the
    /// dataset is consistent.
    #[must_use]
    pub fn integrity_errors(&self) -> Vec<String> {
        let mut problems = Vec::new();

        report_duplicates(&mut problems, "category id", self.categories.iter().map(|c| c.id));
        report_duplicates(&mut problems, "category slug", self.categories.iter().map(|c| &c.slug));
        report_duplicates(&mut problems, "product id", self.products.iter().map(|p| p.id));
        report_duplicates(&mut problems, "product slug", self.products.iter().map(|p| &p.slug));
        report_duplicates(
            &mut problems,
            "variant id",
            self.products.iter().flat_map(|p| p.variants.iter().map(|v| v.id)),
        );
        report_duplicates(&mut problems, "user id", self.users.iter().map(|u| u.id));
        report_duplicates(
            &mut problems,
            "user email",
            self.users.iter().map(|u| u.email.to_lowercase()),
        );
        report_duplicates(&mut problems, "order id", self.orders.iter().map(|o| o.id));
        report_duplicates(&mut problems, "order number", self.orders.iter().map(|o| &o.number));
        report_duplicates(&mut problems, "coupon id", self.coupons.iter().map(|c| c.id));
        report_duplicates(
            &mut problems,
            "coupon code",
            self.coupons.iter().map(|c| c.code.to_uppercase()),
        );

        for product in &self.products {
            let name = &product.slug;
            if self.category(product.category_id).is_none() {
                problems.push(format!(
                    "product {name}: unknown category {}",
                    product.category_id
                ));
            }
            if product.price <= Decimal::ZERO {
                problems.push(format!("product {name}: price must be positive"));
            }
            if product
                .discount_price
                .is_some_and(|d| d <= Decimal::ZERO || d >= product.price)
            {
                problems.push(format!(
                    "product {name}: discount price must be between 0 and the price"
                ));
            }
            if product.rating < Decimal::ZERO || product.rating > Decimal::from(5) {
                problems.push(format!("product {name}: rating must be within 0..=5"));
            }
            if product.variants.is_empty() {
                problems.push(format!("product {name}: has no variants"));
            }
        }

        for order in &self.orders {
            let number = &order.number;
            if let Some(user_id) = order.user_id
                && self.user(user_id).is_none()
            {
                problems.push(format!("order {number}: unknown user {user_id}"));
            }
            for item in &order.items {
                match self.variant(item.variant_id) {
                    Some((product, _)) if product.id == item.product_id => {}
                    Some(_) => problems.push(format!(
                        "order {number}: variant {} does not belong to product {}",
                        item.variant_id, item.product_id
                    )),
                    None => problems.push(format!(
                        "order {number}: unknown variant {}",
                        item.variant_id
                    )),
                }
            }
        }
        if next_order_number(&self.orders).is_none() {
            problems.push("orders: the highest order number leaves no next number".to_owned());
        }

        for coupon in &self.coupons {
            let valid = match coupon.discount {
                DiscountKind::Percentage(p) => p > Decimal::ZERO && p <= Decimal::ONE_HUNDRED,
                DiscountKind::FixedAmount(a) => a > Decimal::ZERO,
            };
            if !valid {
                problems.push(format!("coupon {}: discount value out of range", coupon.code));
            }
        }

        let tax = self.settings.tax_rate_percent;
        if tax < Decimal::ZERO || tax >= Decimal::ONE_HUNDRED {
            problems.push("settings: tax rate must be within 0..100".to_owned());
        }

        problems
    }
}

fn report_duplicates<T, I>(problems: &mut Vec<String>, what: &str, values: I)
where
    T: Ord + Display,
    I: IntoIterator<Item = T>,
{
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    problems.extend(
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(value, n)| format!("duplicate {what} {value} ({n} records)")),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::checkout::{PaymentForm, ShippingForm};
    use crate::order::ORDER_NUMBER_PREFIX;
    use crate::types::OrderStatus;

    fn completed_checkout() -> Checkout {
        let mut checkout = Checkout::default();
        let shipping = ShippingForm {
            email: "guest@example.com".to_owned(),
            first_name: "Sam".to_owned(),
            last_name: "Lee".to_owned(),
            line1: "1 Pier Rd".to_owned(),
            city: "Bar Harbor".to_owned(),
            region: "ME".to_owned(),
            postal_code: "04609".to_owned(),
            country: "United States".to_owned(),
            ..ShippingForm::default()
        };
        checkout.set_shipping(shipping.validate().unwrap());
        let payment = PaymentForm {
            cardholder: "Sam Lee".to_owned(),
            card_number: "4242424242424242".to_owned(),
            expiry: "12/39".to_owned(),
            cvc: "123".to_owned(),
        };
        checkout
            .set_payment(payment.validate(Utc::now().date_naive()).unwrap())
            .unwrap();
        checkout
    }

    fn first_in_stock(dataset: &Dataset) -> (ProductId, VariantId, u32) {
        dataset
            .active_products()
            .find_map(|p| {
                p.variants
                    .iter()
                    .find(|v| v.stock >= 2)
                    .map(|v| (p.id, v.id, v.stock))
            })
            .unwrap()
    }

    #[test]
    fn test_seed_passes_integrity_checks() {
        let dataset = Dataset::seed().unwrap();
        assert!(dataset.integrity_errors().is_empty());
        assert!(!dataset.products.is_empty());
        assert!(dataset.users.iter().any(User::is_admin));
    }

    #[test]
    fn test_integrity_reports_broken_references() {
        let mut dataset = Dataset::seed().unwrap();
        dataset.products[0].category_id = CategoryId::new(9999);
        let dup = dataset.coupons[0].clone();
        dataset.coupons.push(dup);

        let problems = dataset.integrity_errors();
        assert!(problems.iter().any(|p| p.contains("unknown category 9999")));
        assert!(problems.iter().any(|p| p.starts_with("duplicate coupon id")));
    }

    #[test]
    fn test_integrity_reports_exhausted_order_numbers() {
        let mut dataset = Dataset::seed().unwrap();
        dataset.orders[0].number = format!("HP-{}", u32::MAX);

        let problems = dataset.integrity_errors();
        assert!(problems.iter().any(|p| p.contains("leaves no next number")));

        let (product_id, variant_id, stock) = first_in_stock(&dataset);
        let product = dataset.product(product_id).unwrap().clone();
        let mut cart = Cart::default();
        cart.add(&product, variant_id, 1).unwrap();
        let result = dataset.place_order(&completed_checkout(), &mut cart, None, Utc::now());
        assert_eq!(result, Err(PlaceOrderError::NumbersExhausted));
        assert_eq!(dataset.variant(variant_id).unwrap().1.stock, stock);
    }

    #[test]
    fn test_from_yaml_rejects_integrity_failures() {
        let mut dataset = Dataset::seed().unwrap();
        dataset.products[0].price = Decimal::ZERO;
        let yaml = serde_yaml::to_string(&dataset).unwrap();
        assert!(matches!(
            Dataset::from_yaml(&yaml),
            Err(DatasetError::Integrity(_))
        ));
    }

    #[test]
    fn test_quote_reports_invalid_coupon() {
        let dataset = Dataset::seed().unwrap();
        let (_, variant_id, _) = first_in_stock(&dataset);
        let (product, _) = dataset.variant(variant_id).unwrap();
        let mut cart = Cart::default();
        cart.add(product, variant_id, 1).unwrap();
        cart.coupon_code = Some("NOT-A-CODE".to_owned());

        let quote = dataset.quote(&cart, ShippingMethod::Standard, Utc::now());
        assert_eq!(quote.coupon_error, Some(CouponError::NotFound));
        assert!(quote.totals.discount.is_zero());
    }

    #[test]
    fn test_place_order_decrements_stock() {
        let mut dataset = Dataset::seed().unwrap();
        let (product_id, variant_id, stock) = first_in_stock(&dataset);
        let product = dataset.product(product_id).unwrap().clone();
        let mut cart = Cart::default();
        cart.add(&product, variant_id, 2).unwrap();
        let orders_before = dataset.orders.len();

        let order = dataset
            .place_order(&completed_checkout(), &mut cart, None, Utc::now())
            .unwrap();

        assert!(order.number.starts_with(ORDER_NUMBER_PREFIX));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(dataset.orders.len(), orders_before + 1);
        assert_eq!(dataset.variant(variant_id).unwrap().1.stock, stock - 2);
        assert!(dataset.order_by_number(&order.number).is_some());
    }

    #[test]
    fn test_place_order_refuses_changed_cart() {
        let mut dataset = Dataset::seed().unwrap();
        let (product_id, variant_id, _) = first_in_stock(&dataset);
        let product = dataset.product(product_id).unwrap().clone();
        let mut cart = Cart::default();
        cart.add(&product, variant_id, 1).unwrap();
        dataset.products.retain(|p| p.id != product_id);

        let result = dataset.place_order(&completed_checkout(), &mut cart, None, Utc::now());
        assert!(matches!(result, Err(PlaceOrderError::ItemsChanged(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_place_order_refuses_cart_that_changed_after_review() {
        let mut dataset = Dataset::seed().unwrap();
        let variant_id = VariantId::new(101);
        let (product, _) = dataset.variant(variant_id).unwrap();
        let product = product.clone();
        let mut cart = Cart::default();
        cart.add(&product, variant_id, 2).unwrap();
        cart.coupon_code = Some("WELCOME10".to_owned());
        let reviewed = dataset.quote(&cart, ShippingMethod::Standard, Utc::now());
        assert_eq!(reviewed.totals.total, Decimal::new(10584, 2));

        // Stock sells down to one before the shopper places the order.
        dataset
            .products
            .iter_mut()
            .flat_map(|p| p.variants.iter_mut())
            .find(|v| v.id == variant_id)
            .unwrap()
            .stock = 1;
        let orders_before = dataset.orders.len();

        let result = dataset.place_order(&completed_checkout(), &mut cart, None, Utc::now());
        let Err(PlaceOrderError::ItemsChanged(changes)) = result else {
            panic!("expected the order to be refused");
        };
        assert_eq!(
            changes,
            vec![CartChange::QuantityReduced {
                name: product.name.clone(),
                available: 1
            }]
        );
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(dataset.orders.len(), orders_before);
        assert_eq!(dataset.variant(variant_id).unwrap().1.stock, 1);
    }

    #[test]
    fn test_place_order_refuses_lapsed_coupon() {
        let mut dataset = Dataset::seed().unwrap();
        let variant_id = VariantId::new(101);
        let (product, _) = dataset.variant(variant_id).unwrap();
        let product = product.clone();
        let mut cart = Cart::default();
        cart.add(&product, variant_id, 2).unwrap();
        cart.coupon_code = Some("WELCOME10".to_owned());

        let coupon = dataset
            .coupons
            .iter_mut()
            .find(|c| c.code == "WELCOME10")
            .unwrap();
        coupon.usage_limit = Some(coupon.times_used);
        let times_used = coupon.times_used;
        let orders_before = dataset.orders.len();

        let result = dataset.place_order(&completed_checkout(), &mut cart, None, Utc::now());
        assert_eq!(
            result,
            Err(PlaceOrderError::CouponRemoved {
                code: "WELCOME10".to_owned(),
                reason: CouponError::Exhausted,
            })
        );
        assert_eq!(cart.coupon_code, None);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(dataset.orders.len(), orders_before);
        assert_eq!(dataset.variant(variant_id).unwrap().1.stock, 12);
        assert_eq!(dataset.coupons[0].times_used, times_used);
    }
}
