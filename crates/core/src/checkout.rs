//! Multi-step checkout: Shipping → Payment → Review → placed order.
//!
//! [`Checkout`] is the progress record kept in the session. Each step's form
//! validates into the data the next step needs, and a step is only reachable
//! once every earlier step has been completed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartTotals, ShippingMethod};
use crate::order::{Address, Order, OrderItem, PaymentSummary};
use crate::types::{Email, OrderId, OrderStatus, PaymentStatus, UserId};
use crate::validation::{
    FieldErrors, card_brand, card_digits, is_valid_cvc, is_valid_phone, is_valid_postal_code,
    luhn_valid, parse_expiry,
};

/// Checkout steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Review,
}

impl CheckoutStep {
    pub const ALL: [Self; 3] = [Self::Shipping, Self::Payment, Self::Review];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Shipping => "Shipping",
            Self::Payment => "Payment",
            Self::Review => "Review",
        }
    }

    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Shipping => "/checkout/shipping",
            Self::Payment => "/checkout/payment",
            Self::Review => "/checkout/review",
        }
    }

    /// 1-based position for the step indicator.
    #[must_use]
    pub const fn number(&self) -> usize {
        match self {
            Self::Shipping => 1,
            Self::Payment => 2,
            Self::Review => 3,
        }
    }
}

/// Why an order could not be placed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Please complete the {} step first", .0.label())]
    IncompleteStep(CheckoutStep),
}

/// Validated shipping step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub email: Email,
    pub address: Address,
    pub method: ShippingMethod,
}

/// Checkout progress kept in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub shipping: Option<ShippingDetails>,
    pub payment: Option<PaymentSummary>,
}

impl Checkout {
    /// First step that is not yet complete (Review once both forms pass).
    #[must_use]
    pub fn current_step(&self) -> CheckoutStep {
        match (&self.shipping, &self.payment) {
            (None, _) => CheckoutStep::Shipping,
            (Some(_), None) => CheckoutStep::Payment,
            (Some(_), Some(_)) => CheckoutStep::Review,
        }
    }

    /// A step is reachable when all earlier steps are complete.
    #[must_use]
    pub fn can_access(&self, step: CheckoutStep) -> bool {
        step <= self.current_step()
    }

    /// Shipping method chosen so far, standard until the shipping step is
    /// done.
    #[must_use]
    pub fn shipping_method(&self) -> ShippingMethod {
        self.shipping
            .as_ref()
            .map_or(ShippingMethod::Standard, |s| s.method)
    }

    /// Record the shipping step. Changing the address invalidates nothing
    /// else, so payment stays filled in.
    pub fn set_shipping(&mut self, details: ShippingDetails) {
        self.shipping = Some(details);
    }

    /// Record the payment step.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::IncompleteStep`] if shipping is missing.
    pub fn set_payment(&mut self, payment: PaymentSummary) -> Result<(), CheckoutError> {
        if self.shipping.is_none() {
            return Err(CheckoutError::IncompleteStep(CheckoutStep::Shipping));
        }
        self.payment = Some(payment);
        Ok(())
    }

    /// Turn the completed checkout into an order. `totals` must have been
    /// computed from `cart` with this checkout's shipping method.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] for an empty cart or an incomplete step.
    pub fn build_order(
        &self,
        cart: &Cart,
        totals: &CartTotals,
        meta: OrderMeta,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let shipping = self
            .shipping
            .as_ref()
            .ok_or(CheckoutError::IncompleteStep(CheckoutStep::Shipping))?;
        let payment = self
            .payment
            .clone()
            .ok_or(CheckoutError::IncompleteStep(CheckoutStep::Payment))?;

        let items = cart
            .items
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                variant_id: line.variant_id,
                name: line.name.clone(),
                variant_label: line.variant_label.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        Ok(Order {
            id: meta.id,
            number: meta.number,
            user_id: meta.user_id,
            email: shipping.email.to_string(),
            items,
            shipping_address: shipping.address.clone(),
            shipping_method: shipping.method,
            payment,
            coupon_code: cart.coupon_code.clone().filter(|_| !totals.discount.is_zero()),
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Paid,
            tracking_number: None,
            placed_at: meta.placed_at,
            updated_at: meta.placed_at,
        })
    }
}

/// Identity assigned to a new order by the store.
#[derive(Debug, Clone)]
pub struct OrderMeta {
    pub id: OrderId,
    pub number: String,
    pub user_id: Option<UserId>,
    pub placed_at: DateTime<Utc>,
}

/// Shipping step form, as posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub shipping_method: String,
}

impl ShippingForm {
    /// Pre-fill from an earlier submission.
    #[must_use]
    pub fn from_details(details: &ShippingDetails) -> Self {
        let a = &details.address;
        Self {
            email: details.email.to_string(),
            first_name: a.first_name.clone(),
            last_name: a.last_name.clone(),
            line1: a.line1.clone(),
            line2: a.line2.clone().unwrap_or_default(),
            city: a.city.clone(),
            region: a.region.clone(),
            postal_code: a.postal_code.clone(),
            country: a.country.clone(),
            phone: a.phone.clone().unwrap_or_default(),
            shipping_method: details.method.as_str().to_owned(),
        }
    }

    /// Validate every field, collecting all failures.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field fails.
    pub fn validate(&self) -> Result<ShippingDetails, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.add("email", e.to_string());
                None
            }
        };
        let first_name = errors.require("first_name", "First name", &self.first_name);
        let last_name = errors.require("last_name", "Last name", &self.last_name);
        let line1 = errors.require("line1", "Address", &self.line1);
        let city = errors.require("city", "City", &self.city);
        let region = errors.require("region", "State / region", &self.region);
        let country = errors.require("country", "Country", &self.country);
        let postal_code = errors.require("postal_code", "Postal code", &self.postal_code);
        if !postal_code.is_empty() && !is_valid_postal_code(&postal_code) {
            errors.add("postal_code", "Enter a valid postal code");
        }
        let phone = self.phone.trim();
        if !phone.is_empty() && !is_valid_phone(phone) {
            errors.add("phone", "Enter a valid phone number");
        }
        let method = if self.shipping_method.is_empty() {
            ShippingMethod::Standard
        } else {
            self.shipping_method.parse().unwrap_or_else(|_| {
                errors.add("shipping_method", "Choose a shipping method");
                ShippingMethod::Standard
            })
        };

        let line2 = self.line2.trim();
        let address = Address {
            first_name,
            last_name,
            line1,
            line2: (!line2.is_empty()).then(|| line2.to_owned()),
            city,
            region,
            postal_code: postal_code.to_uppercase(),
            country,
            phone: (!phone.is_empty()).then(|| phone.to_owned()),
        };

        match email {
            Some(email) if errors.is_empty() => Ok(ShippingDetails {
                email,
                address,
                method,
            }),
            _ => Err(errors),
        }
    }
}

/// Payment step form, as posted. Never stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentForm {
    pub cardholder: String,
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
}

impl PaymentForm {
    /// Validate the card and keep only its brand and last four digits.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field fails.
    pub fn validate(&self, today: NaiveDate) -> Result<PaymentSummary, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("cardholder", "Name on card", &self.cardholder);

        let digits = if self.card_number.trim().is_empty() {
            errors.add("card_number", "Card number is required");
            None
        } else {
            match card_digits(&self.card_number) {
                Some(d) if luhn_valid(&d) => Some(d),
                Some(_) => {
                    errors.add("card_number", "That card number isn't valid");
                    None
                }
                None => {
                    errors.add("card_number", "Card numbers have 13 to 19 digits");
                    None
                }
            }
        };

        if self.expiry.trim().is_empty() {
            errors.add("expiry", "Expiry date is required");
        } else if let Err(e) = parse_expiry(&self.expiry, today) {
            errors.add("expiry", e.to_string());
        }

        if !is_valid_cvc(&self.cvc) {
            errors.add("cvc", "CVC must be 3 or 4 digits");
        }

        match digits {
            Some(d) if errors.is_empty() => Ok(PaymentSummary {
                brand: card_brand(&d).to_owned(),
                last4: d.chars().skip(d.len().saturating_sub(4)).collect(),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::PricingPolicy;
    use crate::catalog::tests::{d, product};
    use crate::types::VariantId;

    fn shipping_form() -> ShippingForm {
        ShippingForm {
            email: "ana@example.com".to_owned(),
            first_name: "Ana".to_owned(),
            last_name: "Reyes".to_owned(),
            line1: "12 Dock St".to_owned(),
            line2: String::new(),
            city: "Portland".to_owned(),
            region: "ME".to_owned(),
            postal_code: "04101".to_owned(),
            country: "United States".to_owned(),
            phone: String::new(),
            shipping_method: "express".to_owned(),
        }
    }

    fn payment_form() -> PaymentForm {
        PaymentForm {
            cardholder: "Ana Reyes".to_owned(),
            card_number: "4242 4242 4242 4242".to_owned(),
            expiry: "12/30".to_owned(),
            cvc: "123".to_owned(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        let mut checkout = Checkout::default();
        assert_eq!(checkout.current_step(), CheckoutStep::Shipping);
        assert!(!checkout.can_access(CheckoutStep::Payment));

        let payment = payment_form().validate(today()).unwrap();
        assert_eq!(
            checkout.set_payment(payment.clone()),
            Err(CheckoutError::IncompleteStep(CheckoutStep::Shipping))
        );

        checkout.set_shipping(shipping_form().validate().unwrap());
        assert!(checkout.can_access(CheckoutStep::Payment));
        assert!(!checkout.can_access(CheckoutStep::Review));

        checkout.set_payment(payment).unwrap();
        assert_eq!(checkout.current_step(), CheckoutStep::Review);
        assert!(checkout.can_access(CheckoutStep::Shipping));
    }

    #[test]
    fn test_shipping_form_collects_all_errors() {
        let form = ShippingForm {
            email: "nope".to_owned(),
            postal_code: "!!".to_owned(),
            phone: "12".to_owned(),
            ..ShippingForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("first_name"));
        assert!(errors.has("line1"));
        assert_eq!(errors.get("postal_code"), Some("Enter a valid postal code"));
        assert!(errors.has("phone"));
    }

    #[test]
    fn test_shipping_form_normalizes() {
        let mut form = shipping_form();
        form.email = " Ana@Example.com ".to_owned();
        form.postal_code = "sw1a 1aa".to_owned();
        let details = form.validate().unwrap();
        assert_eq!(details.email.as_str(), "ana@example.com");
        assert_eq!(details.address.postal_code, "SW1A 1AA");
        assert_eq!(details.method, ShippingMethod::Express);
        assert_eq!(ShippingForm::from_details(&details).shipping_method, "express");
    }

    #[test]
    fn test_payment_form_keeps_only_last_four() {
        let summary = payment_form().validate(today()).unwrap();
        assert_eq!(summary.brand, "Visa");
        assert_eq!(summary.last4, "4242");
    }

    #[test]
    fn test_payment_form_errors() {
        let form = PaymentForm {
            cardholder: String::new(),
            card_number: "4242 4242 4242 4241".to_owned(),
            expiry: "01/20".to_owned(),
            cvc: "1".to_owned(),
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.get("card_number"), Some("That card number isn't valid"));
        assert_eq!(errors.get("expiry"), Some("This card has expired"));
        assert!(errors.has("cvc"));
        assert!(errors.has("cardholder"));
    }

    #[test]
    fn test_build_order() {
        let mut checkout = Checkout::default();
        checkout.set_shipping(shipping_form().validate().unwrap());
        checkout
            .set_payment(payment_form().validate(today()).unwrap())
            .unwrap();

        let p = product(1, "Tote", 1, "30");
        let mut cart = Cart::default();
        cart.add(&p, VariantId::new(10), 2).unwrap();
        let policy = PricingPolicy {
            tax_rate: d("0.1"),
            standard_shipping: d("5"),
            express_shipping: d("15"),
            free_shipping_threshold: None,
        };
        let method = checkout.shipping_method();
        let totals = CartTotals::compute(cart.subtotal(), d("0"), method, &policy);
        let meta = OrderMeta {
            id: OrderId::new(9),
            number: "HP-1009".to_owned(),
            user_id: None,
            placed_at: Utc::now(),
        };

        let order = checkout.build_order(&cart, &totals, meta).unwrap();
        assert_eq!(order.total, d("81"));
        assert_eq!(order.shipping, d("15"));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.email, "ana@example.com");
    }

    #[test]
    fn test_build_order_requires_items() {
        let checkout = Checkout::default();
        let totals = CartTotals::compute(
            d("0"),
            d("0"),
            ShippingMethod::Standard,
            &PricingPolicy {
                tax_rate: d("0"),
                standard_shipping: d("0"),
                express_shipping: d("0"),
                free_shipping_threshold: None,
            },
        );
        let meta = OrderMeta {
            id: OrderId::new(1),
            number: "HP-1001".to_owned(),
            user_id: None,
            placed_at: Utc::now(),
        };
        assert_eq!(
            checkout.build_order(&Cart::default(), &totals, meta),
            Err(CheckoutError::EmptyCart)
        );
    }
}
