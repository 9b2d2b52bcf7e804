//! Order tracking route handlers.
//!
//! Guests look an order up by number and the email it was placed with. A
//! successful lookup is remembered in the session so the detail page can
//! be revisited without retyping.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::order::Order;

use crate::db::OrderRepository;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::models::session::{flash, remember_order, tracked_orders};
use crate::state::AppState;
use crate::views::{Layout, OrderView};

/// Tracking lookup form data.
#[derive(Debug, Default, Deserialize)]
pub struct TrackForm {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub email: String,
}

/// Tracking lookup page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/track.html")]
pub struct TrackTemplate {
    pub layout: Layout,
    pub number: String,
    pub email: String,
    pub error: Option<String>,
}

/// Order tracking detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

/// Whether this visitor may see `order`: it belongs to the signed-in user
/// or was placed or looked up in this session.
pub(crate) async fn may_view(session: &Session, auth: &OptionalAuth, order: &Order) -> bool {
    if auth
        .0
        .as_ref()
        .is_some_and(|user| order.user_id == Some(user.id))
    {
        return true;
    }
    tracked_orders(session).await.contains(&order.number)
}

/// Display the tracking lookup form.
#[instrument(skip(state, session))]
pub async fn track_page(State(state): State<AppState>, session: Session) -> TrackTemplate {
    TrackTemplate {
        layout: Layout::load(&state, &session).await,
        number: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Look up an order by number and email.
#[instrument(skip(state, session, form), fields(number = %form.number))]
pub async fn track(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<TrackForm>,
) -> Result<Response> {
    let found = OrderRepository::new(state.store())
        .find_for_tracking(&form.number, &form.email)
        .await;

    let Some(order) = found else {
        tracing::info!("Tracking lookup missed");
        let page = TrackTemplate {
            layout: Layout::load(&state, &session).await,
            number: form.number,
            email: form.email,
            error: Some(
                "We couldn't find an order with that number and email address.".to_string(),
            ),
        };
        return Ok((StatusCode::NOT_FOUND, page).into_response());
    };

    remember_order(&session, &order.number).await?;
    add_breadcrumb(
        "orders",
        "Order tracked",
        &[("order_number", order.number.clone())],
    );
    Ok(Redirect::to(&format!("/orders/{}", order.number)).into_response())
}

/// Display tracking detail for an order this visitor may see.
#[instrument(skip(state, session, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Path(number): Path<String>,
) -> Result<Response> {
    let order = OrderRepository::new(state.store())
        .get_by_number(&number)
        .await;

    // Unknown and not-yours look the same from outside.
    let order = match order {
        Some(order) if may_view(&session, &auth, &order).await => order,
        _ => {
            flash(
                &session,
                Flash::info("Enter your order number and email to see its status."),
            )
            .await;
            return Ok(Redirect::to("/orders/track").into_response());
        }
    };

    let view = {
        let dataset = state.store().read().await;
        OrderView::new(&order, &dataset.settings)
    };
    Ok(OrderShowTemplate {
        layout: Layout::load(&state, &session).await,
        order: view,
    }
    .into_response())
}
