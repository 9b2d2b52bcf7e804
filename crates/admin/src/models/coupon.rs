//! Coupon edit form.
//!
//! Dates are entered as calendar days: a coupon starts at the beginning of
//! its start day and stays valid through the end of its expiry day (UTC).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use harbor_core::CouponId;
use harbor_core::coupon::{Coupon, DiscountKind, normalize_code};
use harbor_core::validation::{FieldErrors, parse_money};

const MIN_CODE_LEN: usize = 3;
const MAX_CODE_LEN: usize = 32;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Coupon form, as posted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CouponForm {
    pub code: String,
    pub description: String,
    /// `percentage` or `fixed_amount`.
    pub discount_type: String,
    pub value: String,
    pub min_subtotal: String,
    pub usage_limit: String,
    /// `YYYY-MM-DD`, blank for "immediately".
    pub starts_at: String,
    /// `YYYY-MM-DD`, blank for "never".
    pub expires_at: String,
    /// Checkbox: present when ticked.
    pub active: Option<String>,
}

/// A validated coupon form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponInput {
    pub code: String,
    pub description: String,
    pub discount: DiscountKind,
    pub min_subtotal: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl CouponForm {
    /// Form pre-filled from an existing coupon.
    #[must_use]
    pub fn from_coupon(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            discount_type: coupon.discount.kind_str().to_string(),
            value: coupon.discount.value().normalize().to_string(),
            min_subtotal: coupon
                .min_subtotal
                .map(|m| m.to_string())
                .unwrap_or_default(),
            usage_limit: coupon
                .usage_limit
                .map(|l| l.to_string())
                .unwrap_or_default(),
            starts_at: coupon
                .starts_at
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            expires_at: coupon
                .expires_at
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            active: coupon.active.then(|| "on".to_string()),
        }
    }

    /// Blank form for a new coupon.
    #[must_use]
    pub fn new_coupon() -> Self {
        Self {
            discount_type: "percentage".to_string(),
            active: Some("on".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_percentage(&self) -> bool {
        self.discount_type != "fixed_amount"
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Validate against the existing coupons. `editing` is the coupon being
    /// edited, which may keep its own code.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field fails.
    pub fn validate(
        &self,
        coupons: &[Coupon],
        editing: Option<CouponId>,
    ) -> Result<CouponInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let code = normalize_code(&errors.require("code", "Code", &self.code));
        if !code.is_empty() {
            if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len())
                || !code
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                errors.add(
                    "code",
                    format!(
                        "Code must be {MIN_CODE_LEN}-{MAX_CODE_LEN} characters: \
                         letters, digits, dashes or underscores"
                    ),
                );
            } else if coupons
                .iter()
                .any(|c| normalize_code(&c.code) == code && Some(c.id) != editing)
            {
                errors.add("code", "Another coupon already uses this code");
            }
        }

        let amount = self.value.trim().trim_end_matches('%').parse::<Decimal>().ok();
        let discount = match self.discount_type.as_str() {
            "percentage" => match amount {
                Some(p) if p > Decimal::ZERO && p <= Decimal::ONE_HUNDRED => {
                    DiscountKind::Percentage(p)
                }
                _ => {
                    errors.add("value", "Percentage must be more than 0 and at most 100");
                    DiscountKind::Percentage(Decimal::ZERO)
                }
            },
            "fixed_amount" => match parse_money(&self.value) {
                Some(a) if a > Decimal::ZERO => DiscountKind::FixedAmount(a),
                _ => {
                    errors.add("value", "Amount must be greater than zero");
                    DiscountKind::FixedAmount(Decimal::ZERO)
                }
            },
            _ => {
                errors.add("discount_type", "Choose a discount type");
                DiscountKind::Percentage(Decimal::ZERO)
            }
        };

        let min_subtotal = optional(&self.min_subtotal, parse_money).unwrap_or_else(|()| {
            errors.add("min_subtotal", "Minimum subtotal must be a non-negative amount");
            None
        });
        let usage_limit = optional(&self.usage_limit, |v| v.parse::<u32>().ok().filter(|l| *l > 0))
            .unwrap_or_else(|()| {
                errors.add("usage_limit", "Usage limit must be a whole number above zero");
                None
            });

        let starts_on = optional(&self.starts_at, parse_date).unwrap_or_else(|()| {
            errors.add("starts_at", "Use the format YYYY-MM-DD");
            None
        });
        let expires_on = optional(&self.expires_at, parse_date).unwrap_or_else(|()| {
            errors.add("expires_at", "Use the format YYYY-MM-DD");
            None
        });
        if let (Some(start), Some(end)) = (starts_on, expires_on)
            && end <= start
        {
            errors.add("expires_at", "Expiry date must be after the start date");
        }

        errors.into_result(CouponInput {
            code,
            description: self.description.trim().to_string(),
            discount,
            min_subtotal,
            usage_limit,
            starts_at: starts_on.map(start_of_day),
            expires_at: expires_on.map(end_of_day),
            active: self.is_active(),
        })
    }
}

/// Parse an optional field: blank is `Ok(None)`, unparseable is `Err(())`.
fn optional<T>(value: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<Option<T>, ()> {
    let value = value.trim();
    if value.is_empty() {
        Ok(None)
    } else {
        parse(value).map(Some).ok_or(())
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
        .and_utc()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use harbor_core::Dataset;

    use super::*;

    fn form() -> CouponForm {
        CouponForm {
            code: " spring15 ".to_string(),
            description: "Spring sale".to_string(),
            discount_type: "percentage".to_string(),
            value: "15".to_string(),
            starts_at: "2026-03-01".to_string(),
            expires_at: "2026-03-31".to_string(),
            active: Some("on".to_string()),
            ..CouponForm::default()
        }
    }

    #[test]
    fn test_valid_form_normalizes_code() {
        let dataset = Dataset::seed().unwrap();
        let input = form().validate(&dataset.coupons, None).unwrap();
        assert_eq!(input.code, "SPRING15");
        assert_eq!(input.discount, DiscountKind::Percentage(Decimal::from(15)));
        assert_eq!(input.expires_at.unwrap().to_rfc3339(), "2026-03-31T23:59:59+00:00");
        assert!(input.active);
    }

    #[test]
    fn test_percentage_range() {
        for value in ["0", "100.5", "abc"] {
            let form = CouponForm {
                value: value.to_string(),
                ..form()
            };
            assert!(form.validate(&[], None).unwrap_err().has("value"), "{value}");
        }
        let form = CouponForm {
            value: "100".to_string(),
            ..form()
        };
        assert!(form.validate(&[], None).is_ok());
    }

    #[test]
    fn test_fixed_amount_must_be_positive() {
        let form = CouponForm {
            discount_type: "fixed_amount".to_string(),
            value: "0".to_string(),
            ..form()
        };
        assert!(form.validate(&[], None).unwrap_err().has("value"));
    }

    #[test]
    fn test_expiry_after_start() {
        let form = CouponForm {
            expires_at: "2026-03-01".to_string(),
            ..form()
        };
        let errors = form.validate(&[], None).unwrap_err();
        assert_eq!(
            errors.get("expires_at"),
            Some("Expiry date must be after the start date")
        );
    }

    #[test]
    fn test_code_unique_case_insensitively() {
        let dataset = Dataset::seed().unwrap();
        let taken = CouponForm {
            code: "welcome10".to_string(),
            ..form()
        };
        assert!(taken.validate(&dataset.coupons, None).unwrap_err().has("code"));

        let existing = dataset.coupons.iter().find(|c| c.code == "WELCOME10").unwrap();
        assert!(taken.validate(&dataset.coupons, Some(existing.id)).is_ok());
    }

    #[test]
    fn test_round_trips_existing_coupon() {
        let dataset = Dataset::seed().unwrap();
        for coupon in &dataset.coupons {
            let form = CouponForm::from_coupon(coupon);
            let input = form.validate(&dataset.coupons, Some(coupon.id)).unwrap();
            assert_eq!(input.discount, coupon.discount, "{}", coupon.code);
            assert_eq!(input.active, coupon.active);
        }
    }
}
