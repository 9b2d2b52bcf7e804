//! Discount coupons.
//!
//! A coupon is a static rule: a percentage or fixed amount off the cart
//! subtotal, optionally limited by a minimum subtotal, a usage count and a
//! start/expiry window. Codes are matched case-insensitively.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CouponId, CurrencyCode, format_money, round_cents};

/// Why a coupon cannot be applied. Messages are shown to shoppers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("We couldn't find a coupon with that code")]
    NotFound,
    #[error("This coupon is no longer active")]
    Disabled,
    #[error("This coupon isn't valid yet")]
    NotStarted,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    Exhausted,
    #[error("This coupon needs a subtotal of at least {minimum:.2}")]
    MinimumNotMet { minimum: Decimal },
}

/// The discount a coupon grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percent off the subtotal, `0 < p ≤ 100`.
    Percentage(Decimal),
    /// Fixed amount off the subtotal.
    FixedAmount(Decimal),
}

impl DiscountKind {
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Percentage(_) => "percentage",
            Self::FixedAmount(_) => "fixed_amount",
        }
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        match self {
            Self::Percentage(v) | Self::FixedAmount(v) => *v,
        }
    }

    /// "15% off" or "$10.00 off".
    #[must_use]
    pub fn describe(&self, currency: CurrencyCode) -> String {
        match self {
            Self::Percentage(p) => format!("{}% off", p.normalize()),
            Self::FixedAmount(a) => format!("{} off", format_money(*a, currency)),
        }
    }
}

/// Lifecycle state of a coupon at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CouponStatus {
    Active,
    Scheduled,
    Expired,
    Exhausted,
    Disabled,
}

impl CouponStatus {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Scheduled => "Scheduled",
            Self::Expired => "Expired",
            Self::Exhausted => "Used up",
            Self::Disabled => "Disabled",
        }
    }

    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Active => "badge badge-success",
            Self::Scheduled => "badge badge-info",
            Self::Expired | Self::Exhausted => "badge badge-neutral",
            Self::Disabled => "badge badge-error",
        }
    }
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount: DiscountKind,
    #[serde(default)]
    pub min_subtotal: Option<Decimal>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl Coupon {
    /// Status at `now`. Disabled wins over every date or usage state.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> CouponStatus {
        if !self.active {
            CouponStatus::Disabled
        } else if self.starts_at.is_some_and(|s| now < s) {
            CouponStatus::Scheduled
        } else if self.expires_at.is_some_and(|e| now >= e) {
            CouponStatus::Expired
        } else if self.usage_limit.is_some_and(|l| self.times_used >= l) {
            CouponStatus::Exhausted
        } else {
            CouponStatus::Active
        }
    }

    /// Discount this coupon grants on `subtotal` at `now`, rounded to cents
    /// and never more than the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] naming the first rule that rejects it.
    pub fn discount_for(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponError> {
        match self.status(now) {
            CouponStatus::Active => {}
            CouponStatus::Disabled => return Err(CouponError::Disabled),
            CouponStatus::Scheduled => return Err(CouponError::NotStarted),
            CouponStatus::Expired => return Err(CouponError::Expired),
            CouponStatus::Exhausted => return Err(CouponError::Exhausted),
        }
        if let Some(minimum) = self.min_subtotal
            && subtotal < minimum
        {
            return Err(CouponError::MinimumNotMet { minimum });
        }

        let raw = match self.discount {
            DiscountKind::Percentage(p) => subtotal * p / Decimal::ONE_HUNDRED,
            DiscountKind::FixedAmount(a) => a,
        };
        Ok(round_cents(raw.clamp(Decimal::ZERO, subtotal)))
    }
}

/// Canonical form of a shopper-entered code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Find a coupon by code, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns [`CouponError::NotFound`] if no coupon carries the code.
pub fn find_coupon<'a>(coupons: &'a [Coupon], code: &str) -> Result<&'a Coupon, CouponError> {
    let code = normalize_code(code);
    coupons
        .iter()
        .find(|c| normalize_code(&c.code) == code)
        .ok_or(CouponError::NotFound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::d;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn coupon(discount: DiscountKind) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SAVE10".to_owned(),
            description: String::new(),
            discount,
            min_subtotal: None,
            usage_limit: None,
            times_used: 0,
            starts_at: None,
            expires_at: None,
            active: true,
        }
    }

    #[test]
    fn test_percentage_discount_rounds() {
        let c = coupon(DiscountKind::Percentage(d("15")));
        assert_eq!(c.discount_for(d("33.33"), now()).unwrap(), d("5.00"));
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let c = coupon(DiscountKind::FixedAmount(d("25")));
        assert_eq!(c.discount_for(d("18"), now()).unwrap(), d("18"));
    }

    #[test]
    fn test_minimum_subtotal() {
        let mut c = coupon(DiscountKind::FixedAmount(d("10")));
        c.min_subtotal = Some(d("50"));
        assert_eq!(
            c.discount_for(d("49.99"), now()),
            Err(CouponError::MinimumNotMet { minimum: d("50") })
        );
        assert!(c.discount_for(d("50"), now()).is_ok());
    }

    #[test]
    fn test_date_window_and_usage() {
        let mut c = coupon(DiscountKind::Percentage(d("10")));
        c.starts_at = Some(now() + chrono::Duration::days(1));
        assert_eq!(c.discount_for(d("10"), now()), Err(CouponError::NotStarted));

        c.starts_at = None;
        c.expires_at = Some(now());
        assert_eq!(c.discount_for(d("10"), now()), Err(CouponError::Expired));

        c.expires_at = None;
        c.usage_limit = Some(3);
        c.times_used = 3;
        assert_eq!(c.discount_for(d("10"), now()), Err(CouponError::Exhausted));

        c.active = false;
        assert_eq!(c.status(now()), CouponStatus::Disabled);
    }

    #[test]
    fn test_find_coupon_ignores_case() {
        let coupons = vec![coupon(DiscountKind::Percentage(d("10")))];
        assert!(find_coupon(&coupons, "  save10 ").is_ok());
        assert_eq!(find_coupon(&coupons, "SAVE20"), Err(CouponError::NotFound));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            DiscountKind::Percentage(d("15.0")).describe(CurrencyCode::USD),
            "15% off"
        );
        assert_eq!(
            DiscountKind::FixedAmount(d("10")).describe(CurrencyCode::USD),
            "$10.00 off"
        );
    }

    #[test]
    fn test_yaml_shape() {
        let yaml = "id: 4\ncode: TAKE5\ndiscount:\n  type: fixed_amount\n  value: \"5\"\n";
        let c: Coupon = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.discount, DiscountKind::FixedAmount(d("5")));
        assert!(c.active);
    }
}
