//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, extract::State, routing::get};
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::{Dataset, OrderStatus, ProductStatus, UserRole};

use crate::db::customers::lifetime_spend;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;
use crate::views::{Layout, OrderRowView};

/// Orders shown under "Recent orders".
const RECENT_ORDERS: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

pub struct StatusCountView {
    pub value: &'static str,
    pub label: &'static str,
    pub badge_class: &'static str,
    pub count: usize,
}

pub struct LowStockView {
    pub product_id: i32,
    pub product_name: String,
    pub variant_id: i32,
    pub variant_label: String,
    pub sku: String,
    pub stock: u32,
}

/// Headline numbers and lists for the dashboard.
pub struct DashboardStats {
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: String,
    pub order_count: usize,
    pub customer_count: usize,
    pub active_products: usize,
    pub product_count: usize,
    pub low_stock: Vec<LowStockView>,
    pub recent_orders: Vec<OrderRowView>,
    pub by_status: Vec<StatusCountView>,
}

impl DashboardStats {
    #[must_use]
    pub fn compute(dataset: &Dataset) -> Self {
        let settings = &dataset.settings;

        let mut low_stock: Vec<LowStockView> = dataset
            .products
            .iter()
            .filter(|p| p.status != ProductStatus::Archived)
            .flat_map(|p| {
                p.variants
                    .iter()
                    .filter(|v| v.stock <= settings.low_stock_threshold)
                    .map(move |v| LowStockView {
                        product_id: p.id.as_i32(),
                        product_name: p.name.clone(),
                        variant_id: v.id.as_i32(),
                        variant_label: v.label().unwrap_or_else(|| "Default".to_string()),
                        sku: v.sku.clone(),
                        stock: v.stock,
                    })
            })
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.sku.cmp(&b.sku)));

        let mut recent: Vec<_> = dataset.orders.iter().collect();
        recent.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));

        Self {
            revenue: settings.money(lifetime_spend(&dataset.orders)),
            order_count: dataset.orders.len(),
            customer_count: dataset
                .users
                .iter()
                .filter(|u| u.role == UserRole::Customer)
                .count(),
            active_products: dataset.products.iter().filter(|p| p.is_active()).count(),
            product_count: dataset.products.len(),
            low_stock,
            recent_orders: recent
                .into_iter()
                .take(RECENT_ORDERS)
                .map(|o| OrderRowView::new(o, settings))
                .collect(),
            by_status: OrderStatus::ALL
                .iter()
                .map(|status| StatusCountView {
                    value: status.as_str(),
                    label: status.label(),
                    badge_class: status.badge_class(),
                    count: dataset.orders.iter().filter(|o| o.status == *status).count(),
                })
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: DashboardStats,
}

/// GET /
#[instrument(skip_all)]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> DashboardTemplate {
    let stats = DashboardStats::compute(&*state.store().read().await);
    DashboardTemplate {
        layout: Layout::load(&state, &session, admin, "/").await,
        stats,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_seed() {
        let dataset = Dataset::seed().unwrap();
        let stats = DashboardStats::compute(&dataset);

        assert_eq!(stats.order_count, dataset.orders.len());
        assert_eq!(
            stats.by_status.iter().map(|s| s.count).sum::<usize>(),
            dataset.orders.len()
        );
        assert!(stats.recent_orders.len() <= RECENT_ORDERS);
        assert!(
            stats
                .low_stock
                .iter()
                .all(|l| l.stock <= dataset.settings.low_stock_threshold)
        );
        assert!(stats.low_stock.windows(2).all(|w| match w {
            [a, b] => a.stock <= b.stock,
            _ => true,
        }));
    }

    #[test]
    fn test_revenue_excludes_cancelled() {
        let mut dataset = Dataset::seed().unwrap();
        let before = DashboardStats::compute(&dataset).revenue;
        for order in &mut dataset.orders {
            order.status = OrderStatus::Cancelled;
        }
        let after = DashboardStats::compute(&dataset).revenue;
        assert_ne!(before, after);
        assert_eq!(after, dataset.settings.money(rust_decimal::Decimal::ZERO));
    }
}
