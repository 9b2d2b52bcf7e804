//! Form field validation.
//!
//! Forms collect their failures into [`FieldErrors`], keyed by field name,
//! so templates can print each message next to its input.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

static POSTAL_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 -]{1,8}[A-Za-z0-9]$").expect("Invalid regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9(][0-9 ().-]{5,18}[0-9]$").expect("Invalid regex"));

static EXPIRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[1-9]|1[0-2])\s*/\s*([0-9]{2})$").expect("Invalid regex")
});

static CVC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("Invalid regex"));

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("Invalid regex"));

/// Per-field validation messages. The first message recorded for a field
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(value)` when no field failed.
    ///
    /// # Errors
    ///
    /// Returns `self` when any field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Trim `value` and record "`label` is required" if it is blank.
    pub fn require(&mut self, field: &str, label: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, format!("{label} is required"));
        }
        trimmed.to_owned()
    }
}

/// 3-10 characters of letters, digits, spaces or dashes (covers US ZIP,
/// ZIP+4, UK and Canadian formats).
#[must_use]
pub fn is_valid_postal_code(value: &str) -> bool {
    POSTAL_CODE_RE.is_match(value.trim())
}

/// Optional leading `+`, 7-15 digits, with spaces, dots, dashes or
/// parentheses as separators.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    let value = value.trim();
    let digits = value.chars().filter(char::is_ascii_digit).count();
    PHONE_RE.is_match(value) && (7..=15).contains(&digits)
}

/// Strip spaces and dashes from a card number and return the digits when
/// there are 13 to 19 of them.
#[must_use]
pub fn card_digits(value: &str) -> Option<String> {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    let valid = (13..=19).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    valid.then_some(digits)
}

/// Luhn checksum over a string of ASCII digits.
#[must_use]
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut n) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            n *= 2;
            if n > 9 {
                n -= 9;
            }
        }
        sum += n;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// Card network guessed from the leading digits.
#[must_use]
pub fn card_brand(digits: &str) -> &'static str {
    let prefix2: u32 = digits.get(..2).and_then(|p| p.parse().ok()).unwrap_or(0);
    let prefix4: u32 = digits.get(..4).and_then(|p| p.parse().ok()).unwrap_or(0);
    if digits.starts_with('4') {
        "Visa"
    } else if (51..=55).contains(&prefix2) || (2221..=2720).contains(&prefix4) {
        "Mastercard"
    } else if prefix2 == 34 || prefix2 == 37 {
        "American Express"
    } else if prefix4 == 6011 || prefix2 == 65 {
        "Discover"
    } else {
        "Card"
    }
}

/// Why an expiry date was rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryError {
    #[error("Use the format MM/YY")]
    Format,
    #[error("This card has expired")]
    Expired,
}

/// Parse an `MM/YY` expiry. A card is valid through the end of its expiry
/// month.
///
/// # Errors
///
/// Returns [`ExpiryError`] for a malformed or past date.
pub fn parse_expiry(value: &str, today: NaiveDate) -> Result<(u32, i32), ExpiryError> {
    let caps = EXPIRY_RE.captures(value.trim()).ok_or(ExpiryError::Format)?;
    let month: u32 = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(ExpiryError::Format)?;
    let yy: i32 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(ExpiryError::Format)?;
    let year = 2000 + yy;

    if (year, month) < (today.year(), today.month()) {
        return Err(ExpiryError::Expired);
    }
    Ok((month, year))
}

#[must_use]
pub fn is_valid_cvc(value: &str) -> bool {
    CVC_RE.is_match(value.trim())
}

/// Lowercase words joined by single dashes, e.g. `linen-shirt`.
#[must_use]
pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

/// Turn a name into a slug: "Linen Shirt (Navy)" → "linen-shirt-navy".
#[must_use]
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse a non-negative money amount with at most two decimals. A leading
/// `$` and surrounding whitespace are accepted.
#[must_use]
pub fn parse_money(value: &str) -> Option<Decimal> {
    let value = value.trim().trim_start_matches('$').trim();
    let amount: Decimal = value.parse().ok()?;
    (amount >= Decimal::ZERO && amount.scale() <= 2).then_some(amount)
}
