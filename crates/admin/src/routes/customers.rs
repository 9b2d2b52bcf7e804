//! Customer route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, RawQuery, State},
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::UserId;
use harbor_core::catalog::paginate;
use harbor_core::settings::StoreSettings;

use crate::components::{DataTable, DataTableConfig, TableColumn};
use crate::db::{CustomerRepository, CustomerSummary};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;
use crate::views::{Layout, OrderRowView, format_date};

/// Customers per list page.
const PER_PAGE: usize = 25;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(index))
        .route("/customers/{id}", get(show))
}

/// Build the customers table configuration.
#[must_use]
pub fn customers_table_config() -> DataTableConfig {
    DataTableConfig::new("/customers")
        .column(TableColumn::sortable("name", "Customer"))
        .column(TableColumn::new("phone", "Phone"))
        .column(TableColumn::sortable("orders", "Orders").numeric())
        .column(TableColumn::sortable("spent", "Spent").numeric())
        .column(TableColumn::sortable("created", "Joined"))
        .search_placeholder("Search customers by name or email")
        .default_sort("created", true)
        .empty_state("No customers found", Some("Try adjusting your search"))
}

/// Customer view for templates.
pub struct CustomerView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub order_count: usize,
    pub lifetime_spend: String,
    pub last_order_at: Option<String>,
    pub created_at: String,
    pub location: Option<String>,
}

impl CustomerView {
    fn new(summary: &CustomerSummary, settings: &StoreSettings) -> Self {
        let user = &summary.user;
        Self {
            id: user.id.as_i32(),
            name: user.full_name(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            order_count: summary.order_count,
            lifetime_spend: settings.money(summary.lifetime_spend),
            last_order_at: summary.last_order_at.map(format_date),
            created_at: format_date(user.created_at),
            location: user
                .addresses
                .first()
                .map(|a| format!("{}, {}", a.city, a.region)),
        }
    }
}

fn sort_customers(customers: &mut [CustomerSummary], key: &str, descending: bool) {
    customers.sort_by(|a, b| {
        let ordering = match key {
            "name" => a
                .user
                .full_name()
                .to_lowercase()
                .cmp(&b.user.full_name().to_lowercase()),
            "orders" => a.order_count.cmp(&b.order_count),
            "spent" => a.lifetime_spend.cmp(&b.lifetime_spend),
            _ => a.user.created_at.cmp(&b.user.created_at),
        };
        let ordering = ordering.then(a.user.id.cmp(&b.user.id));
        if descending { ordering.reverse() } else { ordering }
    });
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub layout: Layout,
    pub table: DataTable,
    pub customers: Vec<CustomerView>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Customers list page handler.
#[instrument(skip_all)]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw): RawQuery,
) -> CustomersIndexTemplate {
    let table = DataTable::new(customers_table_config(), raw.as_deref());
    let mut customers = CustomerRepository::new(state.store())
        .search(&table.query.q)
        .await;
    sort_customers(&mut customers, &table.query.sort.key, table.query.sort.descending);

    let settings = state.store().read().await.settings.clone();
    let page = paginate(customers, table.query.page, PER_PAGE)
        .map(|c| CustomerView::new(&c, &settings));

    CustomersIndexTemplate {
        layout: Layout::load(&state, &session, admin, "/customers").await,
        table,
        customers: page.items,
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/show.html")]
pub struct CustomerShowTemplate {
    pub layout: Layout,
    pub customer: CustomerView,
    pub addresses: Vec<Vec<String>>,
    pub orders: Vec<OrderRowView>,
}

/// Customer detail with order history and lifetime spend.
#[instrument(skip(admin, state, session))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<UserId>,
) -> Result<CustomerShowTemplate> {
    let detail = CustomerRepository::new(state.store())
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("customer".to_string()))?;

    let settings = state.store().read().await.settings.clone();
    Ok(CustomerShowTemplate {
        layout: Layout::load(&state, &session, admin, &format!("/customers/{id}")).await,
        customer: CustomerView::new(&detail.summary, &settings),
        addresses: detail
            .summary
            .user
            .addresses
            .iter()
            .map(harbor_core::order::Address::lines)
            .collect(),
        orders: detail
            .orders
            .iter()
            .map(|o| OrderRowView::new(o, &settings))
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use harbor_core::Dataset;

    use super::*;
    use crate::db::Store;

    #[tokio::test]
    async fn test_sort_by_spend() {
        let store = Store::new(Dataset::seed().unwrap());
        let mut customers = CustomerRepository::new(&store).search("").await;
        sort_customers(&mut customers, "spent", true);
        assert!(customers.windows(2).all(|w| match w {
            [a, b] => a.lifetime_spend >= b.lifetime_spend,
            _ => true,
        }));
    }
}
