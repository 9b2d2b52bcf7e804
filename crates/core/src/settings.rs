//! Store-wide settings edited from the admin console.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::PricingPolicy;
use crate::types::{CurrencyCode, Email, format_money};
use crate::validation::{FieldErrors, parse_money};

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub store_name: String,
    pub support_email: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Sales tax in percent, e.g. `8.25`.
    pub tax_rate_percent: Decimal,
    pub standard_shipping_rate: Decimal,
    pub express_shipping_rate: Decimal,
    #[serde(default)]
    pub free_shipping_threshold: Option<Decimal>,
    /// Variants at or below this stock show up as "low stock".
    pub low_stock_threshold: u32,
    pub products_per_page: usize,
}

impl StoreSettings {
    #[must_use]
    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate: self.tax_rate_percent / Decimal::ONE_HUNDRED,
            standard_shipping: self.standard_shipping_rate,
            express_shipping: self.express_shipping_rate,
            free_shipping_threshold: self.free_shipping_threshold,
        }
    }

    /// Format an amount in the store currency.
    #[must_use]
    pub fn money(&self, amount: Decimal) -> String {
        format_money(amount, self.currency)
    }
}

/// Settings form, as posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub store_name: String,
    pub support_email: String,
    pub currency: String,
    pub tax_rate_percent: String,
    pub standard_shipping_rate: String,
    pub express_shipping_rate: String,
    pub free_shipping_threshold: String,
    pub low_stock_threshold: String,
    pub products_per_page: String,
}

impl SettingsForm {
    #[must_use]
    pub fn from_settings(settings: &StoreSettings) -> Self {
        Self {
            store_name: settings.store_name.clone(),
            support_email: settings.support_email.clone(),
            currency: settings.currency.code().to_owned(),
            tax_rate_percent: settings.tax_rate_percent.to_string(),
            standard_shipping_rate: settings.standard_shipping_rate.to_string(),
            express_shipping_rate: settings.express_shipping_rate.to_string(),
            free_shipping_threshold: settings
                .free_shipping_threshold
                .map(|t| t.to_string())
                .unwrap_or_default(),
            low_stock_threshold: settings.low_stock_threshold.to_string(),
            products_per_page: settings.products_per_page.to_string(),
        }
    }

    /// Validate and convert. A blank free-shipping threshold disables free
    /// shipping.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field fails.
    pub fn validate(&self) -> Result<StoreSettings, FieldErrors> {
        let mut errors = FieldErrors::new();

        let store_name = errors.require("store_name", "Store name", &self.store_name);
        let support_email = match Email::parse(&self.support_email) {
            Ok(email) => email.into_inner(),
            Err(e) => {
                errors.add("support_email", e.to_string());
                String::new()
            }
        };
        let currency = self.currency.parse().unwrap_or_else(|_| {
            errors.add("currency", "Choose a supported currency");
            CurrencyCode::default()
        });

        let tax_rate_percent = self
            .tax_rate_percent
            .trim()
            .parse::<Decimal>()
            .ok()
            .filter(|r| *r >= Decimal::ZERO && *r < Decimal::ONE_HUNDRED)
            .unwrap_or_else(|| {
                errors.add("tax_rate_percent", "Tax rate must be between 0 and 100");
                Decimal::ZERO
            });

        let mut money_field = |field: &str, label: &str, value: &str| {
            parse_money(value).unwrap_or_else(|| {
                errors.add(field, format!("{label} must be a non-negative amount"));
                Decimal::ZERO
            })
        };
        let standard_shipping_rate = money_field(
            "standard_shipping_rate",
            "Standard shipping",
            &self.standard_shipping_rate,
        );
        let express_shipping_rate = money_field(
            "express_shipping_rate",
            "Express shipping",
            &self.express_shipping_rate,
        );
        let free_shipping_threshold = if self.free_shipping_threshold.trim().is_empty() {
            None
        } else {
            Some(money_field(
                "free_shipping_threshold",
                "Free shipping threshold",
                &self.free_shipping_threshold,
            ))
        };

        let low_stock_threshold = self
            .low_stock_threshold
            .trim()
            .parse::<u32>()
            .unwrap_or_else(|_| {
                errors.add("low_stock_threshold", "Enter a whole number");
                0
            });
        let products_per_page = self
            .products_per_page
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=96).contains(n))
            .unwrap_or_else(|| {
                errors.add("products_per_page", "Products per page must be 1 to 96");
                12
            });

        errors.into_result(StoreSettings {
            store_name,
            support_email,
            currency,
            tax_rate_percent,
            standard_shipping_rate,
            express_shipping_rate,
            free_shipping_threshold,
            low_stock_threshold,
            products_per_page,
        })
    }
}
