//! Order route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, RawQuery, State},
    response::Redirect,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::catalog::paginate;
use harbor_core::order::Order;
use harbor_core::{Dataset, OrderId, OrderStatus};

use crate::components::data_table::TableQuery;
use crate::components::{DataTable, DataTableConfig, FilterOption, TableColumn, TableFilter};
use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::Flash;
use crate::models::session::flash;
use crate::state::AppState;
use crate::views::{Layout, OrderRowView, SelectOption, format_datetime};

/// Orders per list page.
const PER_PAGE: usize = 25;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/status", post(update_status))
}

// =============================================================================
// List
// =============================================================================

/// Build the orders table configuration.
#[must_use]
pub fn orders_table_config() -> DataTableConfig {
    DataTableConfig::new("/orders")
        .column(TableColumn::sortable("number", "Order"))
        .column(TableColumn::sortable("placed", "Placed"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::new("items", "Items").numeric())
        .column(TableColumn::sortable("total", "Total").numeric())
        .column(TableColumn::new("payment", "Payment"))
        .column(TableColumn::sortable("status", "Status"))
        .filter(TableFilter::select(
            "status",
            "Status",
            OrderStatus::ALL
                .iter()
                .map(|s| FilterOption::new(s.as_str(), s.label()))
                .collect(),
        ))
        .search_placeholder("Search by order number, email or name")
        .default_sort("placed", true)
        .empty_state("No orders found", Some("Try adjusting your search or filters"))
}

/// Orders matching `query`, in its sort order.
#[must_use]
pub fn list_orders<'a>(dataset: &'a Dataset, query: &TableQuery) -> Vec<&'a Order> {
    let q = query.q.trim().to_lowercase();
    let status = query.filter("status");

    let mut orders: Vec<&Order> = dataset
        .orders
        .iter()
        .filter(|o| status.is_empty() || o.status.as_str() == status)
        .filter(|o| {
            q.is_empty()
                || o.number.to_lowercase().contains(&q)
                || o.email.to_lowercase().contains(&q)
                || o.shipping_address.full_name().to_lowercase().contains(&q)
        })
        .collect();

    orders.sort_by(|a, b| {
        let ordering = match query.sort.key.as_str() {
            "number" => a.number.cmp(&b.number),
            "customer" => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
            "total" => a.total.cmp(&b.total),
            "status" => a.status.as_str().cmp(b.status.as_str()),
            _ => a.placed_at.cmp(&b.placed_at),
        };
        let ordering = ordering.then(a.id.cmp(&b.id));
        if query.sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    orders
}

/// A status tab above the table, with the number of orders in it.
pub struct StatusTabView {
    pub label: &'static str,
    pub href: String,
    pub count: usize,
    pub active: bool,
}

fn status_tabs(dataset: &Dataset, current: &str) -> Vec<StatusTabView> {
    let all = StatusTabView {
        label: "All",
        href: "/orders".to_string(),
        count: dataset.orders.len(),
        active: current.is_empty(),
    };
    std::iter::once(all)
        .chain(OrderStatus::ALL.iter().map(|s| StatusTabView {
            label: s.label(),
            href: format!("/orders?status={}", s.as_str()),
            count: dataset.orders.iter().filter(|o| o.status == *s).count(),
            active: current == s.as_str(),
        }))
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub table: DataTable,
    pub tabs: Vec<StatusTabView>,
    pub orders: Vec<OrderRowView>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// GET /orders
#[instrument(skip_all)]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw): RawQuery,
) -> OrdersIndexTemplate {
    let table = DataTable::new(orders_table_config(), raw.as_deref());
    let (tabs, page) = {
        let dataset = state.store().read().await;
        let orders = list_orders(&dataset, &table.query);
        let page = paginate(orders, table.query.page, PER_PAGE)
            .map(|o| OrderRowView::new(o, &dataset.settings));
        (status_tabs(&dataset, table.query.filter("status")), page)
    };

    OrdersIndexTemplate {
        layout: Layout::load(&state, &session, admin, "/orders").await,
        table,
        tabs,
        orders: page.items,
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }
}

// =============================================================================
// Detail
// =============================================================================

pub struct OrderLineView {
    pub product_id: i32,
    pub name: String,
    pub variant_label: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

pub struct OrderDetailView {
    pub row: OrderRowView,
    pub updated_at: String,
    pub customer_id: Option<i32>,
    pub customer_name: String,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    pub address_lines: Vec<String>,
    pub phone: Option<String>,
    pub shipping_method: &'static str,
    pub payment: String,
    pub tracking_number: Option<String>,
    /// Statuses the order may move to; empty once it is delivered or
    /// cancelled.
    pub next_statuses: Vec<SelectOption>,
}

impl OrderDetailView {
    #[must_use]
    pub fn new(order: &Order, dataset: &Dataset) -> Self {
        let settings = &dataset.settings;
        let customer = order
            .user_id
            .and_then(|id| dataset.user(id))
            .or_else(|| dataset.user_by_email(&order.email));
        Self {
            row: OrderRowView::new(order, settings),
            updated_at: format_datetime(order.updated_at),
            customer_id: customer.filter(|u| !u.is_admin()).map(|u| u.id.as_i32()),
            customer_name: customer.map_or_else(
                || order.shipping_address.full_name(),
                harbor_core::user::User::full_name,
            ),
            lines: order
                .items
                .iter()
                .map(|i| OrderLineView {
                    product_id: i.product_id.as_i32(),
                    name: i.name.clone(),
                    variant_label: i.variant_label.clone(),
                    quantity: i.quantity,
                    unit_price: settings.money(i.unit_price),
                    line_total: settings.money(i.line_total()),
                })
                .collect(),
            subtotal: settings.money(order.subtotal),
            shipping: settings.money(order.shipping),
            tax: settings.money(order.tax),
            discount: (!order.discount.is_zero())
                .then(|| format!("-{}", settings.money(order.discount))),
            coupon_code: order.coupon_code.clone(),
            address_lines: order.shipping_address.lines(),
            phone: order.shipping_address.phone.clone(),
            shipping_method: order.shipping_method.label(),
            payment: order.payment.display(),
            tracking_number: order.tracking_number.clone(),
            next_statuses: order
                .status
                .next_statuses()
                .into_iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), ""))
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderDetailView,
}

/// GET /orders/{id}
#[instrument(skip(admin, state, session))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<OrderId>,
) -> Result<OrderShowTemplate> {
    let order = {
        let dataset = state.store().read().await;
        let order = dataset
            .order(id)
            .ok_or_else(|| AppError::NotFound("order".to_string()))?;
        OrderDetailView::new(order, &dataset)
    };
    Ok(OrderShowTemplate {
        layout: Layout::load(&state, &session, admin, &format!("/orders/{id}")).await,
        order,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

/// POST /orders/{id}/status
#[instrument(skip(admin, state, session, form), fields(status = %form.status))]
async fn update_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let back = Redirect::to(&format!("/orders/{id}"));
    let Ok(next) = form.status.parse::<OrderStatus>() else {
        flash(&session, Flash::error("Choose a status.")).await;
        return Ok(back);
    };

    match OrderRepository::new(state.store())
        .update_status(id, next, Utc::now())
        .await
    {
        Ok(order) => {
            tracing::info!(
                order_number = %order.number,
                status = %order.status,
                admin_id = %admin.id,
                "Order status updated"
            );
            let message = match &order.tracking_number {
                Some(tracking) if next == OrderStatus::Shipped => {
                    format!("{} marked as shipped. Tracking number {tracking}.", order.number)
                }
                _ => format!("{} is now {}.", order.number, order.status.label()),
            };
            flash(&session, Flash::success(message)).await;
            Ok(back)
        }
        Err(RepositoryError::Transition(e)) => {
            flash(&session, Flash::error(format!("Status not changed: {e}."))).await;
            Ok(back)
        }
        Err(e) => Err(e.into()),
    }
}
