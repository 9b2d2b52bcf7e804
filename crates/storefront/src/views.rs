//! Display models shared across pages.
//!
//! Templates only ever see preformatted strings: money is rendered with the
//! store currency here, so a settings change shows up on the next request.

use chrono::{DateTime, Datelike, Utc};
use tower_sessions::Session;

use harbor_core::cart::{Cart, CartItem, CartTotals, MAX_LINE_QUANTITY};
use harbor_core::catalog::{Category, Product};
use harbor_core::order::{Order, OrderItem};
use harbor_core::settings::StoreSettings;

use crate::middleware::current_user;
use crate::models::session::{load_cart, take_flash};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// A link in the header or footer.
#[derive(Clone)]
pub struct NavLink {
    pub label: String,
    pub url: String,
}

/// Everything `base.html` renders around a page.
pub struct Layout {
    pub store_name: String,
    pub support_email: String,
    pub cart_count: u32,
    pub user: Option<CurrentUser>,
    pub flash: Option<Flash>,
    pub categories: Vec<NavLink>,
    pub footer_pages: Vec<NavLink>,
    pub year: i32,
}

impl Layout {
    /// Gather layout data for the current request. Consumes the pending
    /// flash message, if any.
    pub async fn load(state: &AppState, session: &Session) -> Self {
        let (store_name, support_email, categories) = {
            let dataset = state.store().read().await;
            let categories = dataset
                .categories
                .iter()
                .map(|c| NavLink {
                    label: c.name.clone(),
                    url: format!("/categories/{}", c.slug),
                })
                .collect();
            (
                dataset.settings.store_name.clone(),
                dataset.settings.support_email.clone(),
                categories,
            )
        };

        let footer_pages = state
            .content()
            .nav_pages()
            .into_iter()
            .map(|p| NavLink {
                label: p.meta.title.clone(),
                url: format!("/pages/{}", p.slug),
            })
            .collect();

        Self {
            store_name,
            support_email,
            cart_count: load_cart(session).await.item_count(),
            user: current_user(session).await,
            flash: take_flash(session).await,
            categories,
            footer_pages,
            year: Utc::now().year(),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product tile used on listings, search and related products.
#[derive(Clone)]
pub struct ProductCardView {
    pub name: String,
    pub slug: String,
    pub brand: String,
    pub price: String,
    /// List price, shown struck through when on sale.
    pub compare_at: Option<String>,
    pub discount_badge: Option<String>,
    pub image: Option<String>,
    pub initials: String,
    pub rating: String,
    pub review_count: u32,
    pub in_stock: bool,
    pub low_stock: bool,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, settings: &StoreSettings) -> Self {
        let stock = product.total_stock();
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            brand: product.brand.clone(),
            price: settings.money(product.effective_price()),
            compare_at: product
                .is_on_sale()
                .then(|| settings.money(product.price)),
            discount_badge: product.discount_percent().map(|p| format!("-{p}%")),
            image: product.primary_image().map(str::to_owned),
            initials: initials(&product.name),
            rating: format!("{:.1}", product.rating),
            review_count: product.review_count,
            in_stock: stock > 0,
            low_stock: stock > 0 && stock <= settings.low_stock_threshold,
        }
    }
}

/// Two-letter monogram shown when a product has no image.
fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

#[derive(Clone)]
pub struct CategoryView {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub product_count: usize,
}

impl CategoryView {
    #[must_use]
    pub fn new(category: &Category, products: &[Product]) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            product_count: products
                .iter()
                .filter(|p| p.category_id == category.id && p.is_active())
                .count(),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

pub struct CartLineView {
    pub variant_id: i32,
    pub name: String,
    pub slug: String,
    pub variant_label: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    pub image: Option<String>,
    pub initials: String,
    pub max_quantity: u32,
}

impl CartLineView {
    fn new(item: &CartItem, settings: &StoreSettings) -> Self {
        Self {
            variant_id: item.variant_id.as_i32(),
            name: item.name.clone(),
            slug: item.slug.clone(),
            variant_label: item.variant_label.clone(),
            unit_price: settings.money(item.unit_price),
            quantity: item.quantity,
            line_total: settings.money(item.line_total()),
            image: item.image.clone(),
            initials: initials(&item.name),
            max_quantity: MAX_LINE_QUANTITY,
        }
    }
}

pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, settings: &StoreSettings) -> Self {
        Self {
            lines: cart
                .items
                .iter()
                .map(|i| CartLineView::new(i, settings))
                .collect(),
            item_count: cart.item_count(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Subtotal / shipping / tax / discount / total block.
pub struct TotalsView {
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub discount: Option<String>,
    pub total: String,
}

impl TotalsView {
    #[must_use]
    pub fn new(totals: &CartTotals, settings: &StoreSettings) -> Self {
        Self {
            subtotal: settings.money(totals.subtotal),
            shipping: if totals.shipping.is_zero() {
                "Free".to_string()
            } else {
                settings.money(totals.shipping)
            },
            tax: settings.money(totals.tax),
            discount: (!totals.discount.is_zero())
                .then(|| format!("-{}", settings.money(totals.discount))),
            total: settings.money(totals.total),
        }
    }

    fn from_order(order: &Order, settings: &StoreSettings) -> Self {
        Self::new(
            &CartTotals {
                subtotal: order.subtotal,
                shipping: order.shipping,
                tax: order.tax,
                discount: order.discount,
                total: order.total,
            },
            settings,
        )
    }
}

// =============================================================================
// Orders
// =============================================================================

pub struct OrderItemView {
    pub name: String,
    pub variant_label: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl OrderItemView {
    fn new(item: &OrderItem, settings: &StoreSettings) -> Self {
        Self {
            name: item.name.clone(),
            variant_label: item.variant_label.clone(),
            quantity: item.quantity,
            unit_price: settings.money(item.unit_price),
            line_total: settings.money(item.line_total()),
        }
    }
}

pub struct TimelineStepView {
    pub label: &'static str,
    pub reached: bool,
    pub current: bool,
}

/// An order as shown on tracking, confirmation and account pages.
pub struct OrderView {
    pub number: String,
    pub placed_at: String,
    pub email: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub payment_label: &'static str,
    pub payment_class: &'static str,
    pub item_count: u32,
    pub items: Vec<OrderItemView>,
    pub totals: TotalsView,
    pub coupon_code: Option<String>,
    pub address_lines: Vec<String>,
    pub shipping_method: &'static str,
    pub payment: String,
    pub tracking_number: Option<String>,
    pub timeline: Vec<TimelineStepView>,
    pub cancelled: bool,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, settings: &StoreSettings) -> Self {
        Self {
            number: order.number.clone(),
            placed_at: format_date(order.placed_at),
            email: order.email.clone(),
            status_label: order.status.label(),
            status_class: order.status.badge_class(),
            payment_label: order.payment_status.label(),
            payment_class: order.payment_status.badge_class(),
            item_count: order.item_count(),
            items: order
                .items
                .iter()
                .map(|i| OrderItemView::new(i, settings))
                .collect(),
            totals: TotalsView::from_order(order, settings),
            coupon_code: order.coupon_code.clone(),
            address_lines: order.shipping_address.lines(),
            shipping_method: order.shipping_method.label(),
            payment: order.payment.display(),
            tracking_number: order.tracking_number.clone(),
            timeline: order
                .timeline()
                .into_iter()
                .map(|step| TimelineStepView {
                    label: step.status.label(),
                    reached: step.reached,
                    current: step.current,
                })
                .collect(),
            cancelled: order.status == harbor_core::OrderStatus::Cancelled,
        }
    }
}

/// "Mar 4, 2025"
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use harbor_core::Dataset;

    use super::*;

    #[test]
    fn test_product_card_sale_and_stock() {
        let dataset = Dataset::seed().unwrap();
        let settings = &dataset.settings;

        for product in dataset.active_products() {
            let card = ProductCardView::new(product, settings);
            assert_eq!(card.compare_at.is_some(), product.is_on_sale());
            assert_eq!(card.in_stock, product.in_stock());
            assert!(card.price.starts_with(settings.currency.symbol()));
        }
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Harbor Canvas Tote"), "HC");
        assert_eq!(initials("mug"), "M");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_order_view_timeline() {
        let dataset = Dataset::seed().unwrap();
        let order = dataset.order_by_number("HP-1004").unwrap();
        let view = OrderView::new(order, &dataset.settings);

        assert_eq!(view.timeline.len(), 4);
        assert!(view.timeline[0].current);
        assert!(!view.timeline[1].reached);
        assert!(!view.cancelled);
    }

    #[test]
    fn test_free_shipping_label() {
        let dataset = Dataset::seed().unwrap();
        let totals = CartTotals {
            subtotal: "120".parse().unwrap(),
            shipping: rust_decimal::Decimal::ZERO,
            tax: "9.60".parse().unwrap(),
            discount: rust_decimal::Decimal::ZERO,
            total: "129.60".parse().unwrap(),
        };
        let view = TotalsView::new(&totals, &dataset.settings);
        assert_eq!(view.shipping, "Free");
        assert!(view.discount.is_none());
    }
}
