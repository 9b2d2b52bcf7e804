//! Price a cart from the command line.
//!
//! ```bash
//! harbor-cli quote --item 101:2 --item 302:1 --coupon WELCOME10 --express
//! ```
//!
//! The cart is built with the same rules as the storefront, so quantities
//! are capped at stock and inactive products are refused.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use harbor_core::cart::{Cart, CartError, ShippingMethod};
use harbor_core::coupon::normalize_code;
use harbor_core::{Dataset, VariantId};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("Invalid item {0:?}: expected VARIANT_ID:QUANTITY")]
    InvalidItem(String),

    #[error("No variant with id {0}")]
    UnknownVariant(VariantId),

    #[error("Variant {variant}: {source}")]
    Cart {
        variant: VariantId,
        source: CartError,
    },

    #[error("Give at least one --item")]
    EmptyCart,
}

/// One `--item` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSpec {
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl FromStr for ItemSpec {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QuoteError::InvalidItem(s.to_string());
        let (variant, quantity) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            variant_id: variant.trim().parse().map_err(|_| invalid())?,
            quantity: quantity.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// A priced cart, formatted in the store currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteReport {
    /// `(description, amount)` per cart line.
    pub lines: Vec<(String, String)>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub coupon_error: Option<String>,
    pub shipping: String,
    pub tax: String,
    pub total: String,
}

/// Build and price a cart.
///
/// # Errors
///
/// Returns [`QuoteError`] for an empty item list, an unknown variant, or a
/// line the cart refuses.
pub fn build_quote(
    dataset: &Dataset,
    items: &[ItemSpec],
    coupon: Option<&str>,
    method: ShippingMethod,
    now: DateTime<Utc>,
) -> Result<QuoteReport, QuoteError> {
    if items.is_empty() {
        return Err(QuoteError::EmptyCart);
    }

    let mut cart = Cart::default();
    for item in items {
        let (product, _) = dataset
            .variant(item.variant_id)
            .ok_or(QuoteError::UnknownVariant(item.variant_id))?;
        let added = cart
            .add(product, item.variant_id, item.quantity)
            .map_err(|source| QuoteError::Cart {
                variant: item.variant_id,
                source,
            })?;
        if added < item.quantity {
            warn!(variant = %item.variant_id, requested = item.quantity, added, "Quantity capped");
        }
    }
    cart.coupon_code = coupon.map(normalize_code).filter(|c| !c.is_empty());

    let quote = dataset.quote(&cart, method, now);
    let settings = &dataset.settings;
    let totals = quote.totals;

    Ok(QuoteReport {
        lines: cart
            .items
            .iter()
            .map(|line| {
                let name = match &line.variant_label {
                    Some(label) => format!("{} ({label})", line.name),
                    None => line.name.clone(),
                };
                (
                    format!("{} x {name}", line.quantity),
                    settings.money(line.line_total()),
                )
            })
            .collect(),
        subtotal: settings.money(totals.subtotal),
        discount: quote
            .coupon
            .as_ref()
            .map(|c| format!("-{} ({})", settings.money(totals.discount), c.code)),
        coupon_error: quote.coupon_error.map(|e| e.to_string()),
        shipping: settings.money(totals.shipping),
        tax: settings.money(totals.tax),
        total: settings.money(totals.total),
    })
}

/// Log a quote report.
pub fn log_report(report: &QuoteReport) {
    for (description, amount) in &report.lines {
        info!("  {description:<48} {amount:>12}");
    }
    info!("  {:<48} {:>12}", "Subtotal", report.subtotal);
    if let Some(discount) = &report.discount {
        info!("  {:<48} {:>12}", "Discount", discount);
    }
    if let Some(error) = &report.coupon_error {
        warn!("Coupon not applied: {error}");
    }
    info!("  {:<48} {:>12}", "Shipping", report.shipping);
    info!("  {:<48} {:>12}", "Tax", report.tax);
    info!("  {:<48} {:>12}", "Total", report.total);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn item(variant: i32, quantity: u32) -> ItemSpec {
        ItemSpec {
            variant_id: VariantId::new(variant),
            quantity,
        }
    }

    #[test]
    fn test_parse_item() {
        assert_eq!("101:2".parse::<ItemSpec>().unwrap(), item(101, 2));
        assert_eq!(" 101 : 3 ".parse::<ItemSpec>().unwrap(), item(101, 3));
        assert!("101".parse::<ItemSpec>().is_err());
        assert!("abc:1".parse::<ItemSpec>().is_err());
        assert!("101:-1".parse::<ItemSpec>().is_err());
    }

    #[test]
    fn test_quote_with_percentage_coupon() {
        let dataset = Dataset::seed().unwrap();
        // 2 x 54.00 sale price, free standard shipping over 75, 8% tax.
        let report = build_quote(
            &dataset,
            &[item(101, 2)],
            Some("welcome10"),
            ShippingMethod::Standard,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.lines[0].1, "$108.00");
        assert_eq!(report.subtotal, "$108.00");
        assert_eq!(report.discount.as_deref(), Some("-$10.80 (WELCOME10)"));
        assert_eq!(report.shipping, "$0.00");
        assert_eq!(report.tax, "$8.64");
        assert_eq!(report.total, "$105.84");
    }

    #[test]
    fn test_invalid_coupon_is_reported_not_fatal() {
        let dataset = Dataset::seed().unwrap();
        let report = build_quote(
            &dataset,
            &[item(101, 1)],
            Some("SUMMER23"),
            ShippingMethod::Express,
            Utc::now(),
        )
        .unwrap();
        assert!(report.discount.is_none());
        assert_eq!(report.coupon_error.as_deref(), Some("This coupon has expired"));
        assert_eq!(report.shipping, "$14.99");
    }

    #[test]
    fn test_out_of_stock_and_unknown_variants() {
        let dataset = Dataset::seed().unwrap();
        let now = Utc::now();
        assert_eq!(
            build_quote(&dataset, &[item(9999, 1)], None, ShippingMethod::Standard, now),
            Err(QuoteError::UnknownVariant(VariantId::new(9999)))
        );
        assert!(matches!(
            build_quote(&dataset, &[item(104, 1)], None, ShippingMethod::Standard, now),
            Err(QuoteError::Cart {
                source: CartError::OutOfStock { .. },
                ..
            })
        ));
        assert_eq!(
            build_quote(&dataset, &[], None, ShippingMethod::Standard, now),
            Err(QuoteError::EmptyCart)
        );
    }
}
