//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::order::Order;
use harbor_core::settings::StoreSettings;
use harbor_core::user::User;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{Result, clear_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::views::{Layout, format_date};

/// Orders shown on the overview page.
const RECENT_ORDERS: usize = 3;

/// One row of the order history table.
pub struct OrderRowView {
    pub number: String,
    pub placed_at: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub item_count: u32,
    pub total: String,
}

impl OrderRowView {
    fn new(order: &Order, settings: &StoreSettings) -> Self {
        Self {
            number: order.number.clone(),
            placed_at: format_date(order.placed_at),
            status_label: order.status.label(),
            status_class: order.status.badge_class(),
            item_count: order.item_count(),
            total: settings.money(order.total),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub member_since: String,
    pub addresses: Vec<Vec<String>>,
    /// The most recent few.
    pub orders: Vec<OrderRowView>,
    pub order_count: usize,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct AccountOrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderRowView>,
}

/// The signed-in user's record. A session pointing at a user that no longer
/// exists is signed out.
async fn load_user(
    state: &AppState,
    session: &Session,
    current: &CurrentUser,
) -> Result<Option<User>> {
    let user = UserRepository::new(state.store()).get_by_id(current.id).await;
    if user.is_none() {
        tracing::warn!(user_id = %current.id, "Session user missing from store");
        clear_current_user(session).await?;
        clear_sentry_user();
    }
    Ok(user)
}

async fn order_rows(state: &AppState, user: &User) -> Vec<OrderRowView> {
    let orders = OrderRepository::new(state.store()).for_user(user).await;
    let dataset = state.store().read().await;
    orders
        .iter()
        .map(|o| OrderRowView::new(o, &dataset.settings))
        .collect()
}

/// Display account overview page.
#[instrument(skip(state, session, current_user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current_user): RequireAuth,
) -> Result<Response> {
    let Some(user) = load_user(&state, &session, &current_user).await? else {
        return Ok(Redirect::to("/auth/login").into_response());
    };

    let mut orders = order_rows(&state, &user).await;
    let order_count = orders.len();
    orders.truncate(RECENT_ORDERS);

    Ok(AccountIndexTemplate {
        layout: Layout::load(&state, &session).await,
        name: user.full_name(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        member_since: format_date(user.created_at),
        addresses: user.addresses.iter().map(|a| a.lines()).collect(),
        orders,
        order_count,
    }
    .into_response())
}

/// Display the full order history.
#[instrument(skip(state, session, current_user))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current_user): RequireAuth,
) -> Result<Response> {
    let Some(user) = load_user(&state, &session, &current_user).await? else {
        return Ok(Redirect::to("/auth/login").into_response());
    };

    Ok(AccountOrdersTemplate {
        orders: order_rows(&state, &user).await,
        layout: Layout::load(&state, &session).await,
    }
    .into_response())
}
