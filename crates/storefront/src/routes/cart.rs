//! Cart route handlers.
//!
//! The cart lives in the session. Mutations are plain form posts that
//! redirect back with a flash message; the cart page re-prices every line
//! against the catalog before showing totals.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::VariantId;
use harbor_core::coupon::find_coupon;

use crate::error::{Result, add_breadcrumb};
use crate::models::Flash;
use crate::models::session::{flash, load_cart, load_checkout, save_cart};
use crate::routes::local_path;
use crate::state::AppState;
use crate::views::{CartView, Layout, TotalsView};

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: i32,
    pub quantity: Option<u32>,
    /// Page to go back to, defaults to the cart.
    pub return_to: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub variant_id: i32,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub variant_id: i32,
}

/// Coupon form data.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
}

/// Coupon currently applied to the cart.
pub struct AppliedCouponView {
    pub code: String,
    pub description: String,
}

/// Code in the cart that no longer qualifies, with the reason.
pub struct CouponProblemView {
    pub code: String,
    pub reason: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub totals: TotalsView,
    pub coupon: Option<AppliedCouponView>,
    pub coupon_problem: Option<CouponProblemView>,
    pub free_shipping_note: Option<String>,
    pub notices: Vec<String>,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartShowTemplate> {
    let mut cart = load_cart(&session).await;
    let checkout = load_checkout(&session).await;

    let dataset = state.store().read().await;
    let settings = &dataset.settings;

    let before = cart.clone();
    let changes = cart.reconcile(&dataset.products);
    if cart != before {
        save_cart(&session, &cart).await?;
    }
    let notices = changes.iter().map(ToString::to_string).collect();

    let quote = dataset.quote(&cart, checkout.shipping_method(), Utc::now());
    let coupon = quote.coupon.as_ref().map(|c| AppliedCouponView {
        code: c.code.clone(),
        description: c.discount.describe(settings.currency),
    });
    let coupon_problem = cart
        .coupon_code
        .clone()
        .zip(quote.coupon_error.as_ref())
        .map(|(code, e)| CouponProblemView {
            code,
            reason: e.to_string(),
        });
    let free_shipping_note = if cart.is_empty() {
        None
    } else {
        settings
            .pricing_policy()
            .remaining_for_free_shipping(quote.totals.subtotal)
            .map(|rest| {
                format!(
                    "Add {} more for free standard shipping.",
                    settings.money(rest)
                )
            })
    };

    let cart_view = CartView::new(&cart, settings);
    let totals = TotalsView::new(&quote.totals, settings);
    drop(dataset);

    Ok(CartShowTemplate {
        layout: Layout::load(&state, &session).await,
        cart: cart_view,
        totals,
        coupon,
        coupon_problem,
        free_shipping_note,
        notices,
    })
}

/// Add item to cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let back = local_path(form.return_to.as_deref(), "/cart");
    let variant_id = VariantId::new(form.variant_id);
    let mut cart = load_cart(&session).await;

    let result = {
        let dataset = state.store().read().await;
        match dataset.variant(variant_id) {
            Some((product, _)) => cart
                .add(product, variant_id, form.quantity.unwrap_or(1))
                .map(|_| product.name.clone()),
            None => Err(harbor_core::cart::CartError::Unavailable),
        }
    };

    match result {
        Ok(name) => {
            save_cart(&session, &cart).await?;
            add_breadcrumb(
                "cart",
                "Added to cart",
                &[("variant_id", variant_id.to_string())],
            );
            flash(&session, Flash::success(format!("Added {name} to your cart."))).await;
        }
        Err(e) => {
            tracing::info!(variant_id = %variant_id, error = %e, "Add to cart refused");
            flash(&session, Flash::error(e.to_string())).await;
        }
    }

    Ok(Redirect::to(&back))
}

/// Update cart item quantity. A quantity of 0 removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    let variant_id = VariantId::new(form.variant_id);
    let mut cart = load_cart(&session).await;

    let available = state
        .store()
        .read()
        .await
        .variant(variant_id)
        .map_or(0, |(_, v)| v.stock);

    match cart.set_quantity(variant_id, form.quantity, available) {
        Ok(()) => {
            save_cart(&session, &cart).await?;
            flash(&session, Flash::info("Cart updated.")).await;
        }
        Err(e) => flash(&session, Flash::error(e.to_string())).await,
    }

    Ok(Redirect::to("/cart"))
}

/// Remove item from cart.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;

    match cart.remove(VariantId::new(form.variant_id)) {
        Ok(line) => {
            save_cart(&session, &cart).await?;
            flash(
                &session,
                Flash::info(format!("Removed {} from your cart.", line.name)),
            )
            .await;
        }
        Err(e) => flash(&session, Flash::error(e.to_string())).await,
    }

    Ok(Redirect::to("/cart"))
}

/// Apply a coupon code. The code is checked against the current subtotal
/// now and re-checked whenever totals are computed.
#[instrument(skip(state, session))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CouponForm>,
) -> Result<Redirect> {
    if form.code.trim().is_empty() {
        flash(&session, Flash::error("Enter a coupon code.")).await;
        return Ok(Redirect::to("/cart"));
    }

    let mut cart = load_cart(&session).await;
    let result = {
        let dataset = state.store().read().await;
        find_coupon(&dataset.coupons, &form.code).and_then(|coupon| {
            coupon
                .discount_for(cart.subtotal(), Utc::now())
                .map(|_| coupon.code.clone())
        })
    };

    match result {
        Ok(code) => {
            cart.coupon_code = Some(code.clone());
            save_cart(&session, &cart).await?;
            add_breadcrumb("cart", "Coupon applied", &[("code", code.clone())]);
            flash(&session, Flash::success(format!("Coupon {code} applied."))).await;
        }
        Err(e) => {
            tracing::info!(code = %form.code, error = %e, "Coupon rejected");
            flash(&session, Flash::error(e.to_string())).await;
        }
    }

    Ok(Redirect::to("/cart"))
}

/// Remove the coupon from the cart.
#[instrument(skip(session))]
pub async fn remove_coupon(session: Session) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    if cart.coupon_code.take().is_some() {
        save_cart(&session, &cart).await?;
        flash(&session, Flash::info("Coupon removed.")).await;
    }
    Ok(Redirect::to("/cart"))
}

/// Get cart count badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> CartCountTemplate {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}
