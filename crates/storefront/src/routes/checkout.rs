//! Checkout route handlers.
//!
//! Shipping → Payment → Review → Confirmation. Progress is kept in the
//! session; each step page redirects to the first incomplete step when
//! requested out of order, and to the cart when the cart is empty.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::cart::{Cart, ShippingMethod};
use harbor_core::checkout::{Checkout, CheckoutStep, PaymentForm, ShippingForm};
use harbor_core::dataset::PlaceOrderError;
use harbor_core::validation::FieldErrors;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::models::session::{
    clear_checkout, flash, load_cart, load_checkout, remember_order, save_cart, save_checkout,
};
use crate::routes::orders::may_view;
use crate::state::AppState;
use crate::views::{CartView, Layout, OrderView, TotalsView};

// =============================================================================
// View Types
// =============================================================================

/// Step indicator entry.
pub struct StepView {
    pub number: usize,
    pub label: &'static str,
    pub url: &'static str,
    pub done: bool,
    pub current: bool,
}

fn steps(checkout: &Checkout, showing: CheckoutStep) -> Vec<StepView> {
    let reached = checkout.current_step();
    CheckoutStep::ALL
        .into_iter()
        .map(|step| StepView {
            number: step.number(),
            label: step.label(),
            url: step.path(),
            done: step < reached && step != showing,
            current: step == showing,
        })
        .collect()
}

/// Order summary sidebar.
pub struct SummaryView {
    pub cart: CartView,
    pub totals: TotalsView,
    pub coupon_code: Option<String>,
}

/// Shipping method radio option.
pub struct MethodOption {
    pub value: &'static str,
    pub label: &'static str,
    pub price: String,
    pub selected: bool,
}

/// Shipping step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/shipping.html")]
pub struct ShippingTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub form: ShippingForm,
    pub errors: FieldErrors,
    pub methods: Vec<MethodOption>,
    pub summary: SummaryView,
}

/// Payment step template. Card number and CVC are never echoed back.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub cardholder: String,
    pub expiry: String,
    pub errors: FieldErrors,
    pub summary: SummaryView,
}

/// Review step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/review.html")]
pub struct ReviewTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub email: String,
    pub address_lines: Vec<String>,
    pub method: &'static str,
    pub payment: String,
    pub summary: SummaryView,
}

/// Confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

// =============================================================================
// Helpers
// =============================================================================

/// Load cart and checkout, or the redirect to send the shopper to when
/// `step` is not reachable yet.
async fn enter(
    session: &Session,
    step: CheckoutStep,
) -> std::result::Result<(Cart, Checkout), Redirect> {
    let cart = load_cart(session).await;
    if cart.is_empty() {
        flash(session, Flash::info("Your cart is empty.")).await;
        return Err(Redirect::to("/cart"));
    }

    let checkout = load_checkout(session).await;
    if !checkout.can_access(step) {
        let current = checkout.current_step();
        flash(
            session,
            Flash::info(format!("Please complete the {} step first.", current.label())),
        )
        .await;
        return Err(Redirect::to(current.path()));
    }

    Ok((cart, checkout))
}

async fn summary(state: &AppState, cart: &Cart, method: ShippingMethod) -> SummaryView {
    let dataset = state.store().read().await;
    let quote = dataset.quote(cart, method, Utc::now());
    SummaryView {
        cart: CartView::new(cart, &dataset.settings),
        totals: TotalsView::new(&quote.totals, &dataset.settings),
        coupon_code: quote.coupon.map(|c| c.code),
    }
}

async fn method_options(state: &AppState, cart: &Cart, chosen: &str) -> Vec<MethodOption> {
    let dataset = state.store().read().await;
    let policy = dataset.settings.pricing_policy();
    ShippingMethod::ALL
        .into_iter()
        .map(|method| {
            let cost = policy.shipping_cost(cart.subtotal(), method);
            MethodOption {
                value: method.as_str(),
                label: method.label(),
                price: if cost.is_zero() {
                    "Free".to_string()
                } else {
                    dataset.settings.money(cost)
                },
                selected: method.as_str() == chosen
                    || (chosen.is_empty() && method == ShippingMethod::default()),
            }
        })
        .collect()
}

/// Pre-fill the shipping form from the signed-in user's profile.
async fn prefill_for_user(state: &AppState, auth: &OptionalAuth) -> ShippingForm {
    let Some(current) = &auth.0 else {
        return ShippingForm::default();
    };
    let Some(user) = UserRepository::new(state.store()).get_by_id(current.id).await else {
        return ShippingForm::default();
    };

    let mut form = ShippingForm {
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        phone: user.phone.clone().unwrap_or_default(),
        ..ShippingForm::default()
    };
    if let Some(address) = user.addresses.first() {
        form.line1.clone_from(&address.line1);
        form.line2 = address.line2.clone().unwrap_or_default();
        form.city.clone_from(&address.city);
        form.region.clone_from(&address.region);
        form.postal_code.clone_from(&address.postal_code);
        form.country.clone_from(&address.country);
    }
    form
}

// =============================================================================
// Handlers
// =============================================================================

/// Redirect to the first incomplete step.
#[instrument(skip(session))]
pub async fn index(session: Session) -> Redirect {
    if load_cart(&session).await.is_empty() {
        return Redirect::to("/cart");
    }
    Redirect::to(load_checkout(&session).await.current_step().path())
}

/// Display the shipping form.
#[instrument(skip(state, session, auth))]
pub async fn shipping_page(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Response {
    let (cart, checkout) = match enter(&session, CheckoutStep::Shipping).await {
        Ok(entered) => entered,
        Err(redirect) => return redirect.into_response(),
    };

    let form = match &checkout.shipping {
        Some(details) => ShippingForm::from_details(details),
        None => prefill_for_user(&state, &auth).await,
    };

    ShippingTemplate {
        steps: steps(&checkout, CheckoutStep::Shipping),
        methods: method_options(&state, &cart, &form.shipping_method).await,
        summary: summary(&state, &cart, checkout.shipping_method()).await,
        layout: Layout::load(&state, &session).await,
        errors: FieldErrors::new(),
        form,
    }
    .into_response()
}

/// Validate and store the shipping step.
#[instrument(skip(state, session, form))]
pub async fn submit_shipping(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let (cart, mut checkout) = match enter(&session, CheckoutStep::Shipping).await {
        Ok(entered) => entered,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    match form.validate() {
        Ok(details) => {
            add_breadcrumb(
                "checkout",
                "Shipping completed",
                &[("method", details.method.as_str().to_string())],
            );
            checkout.set_shipping(details);
            save_checkout(&session, &checkout).await?;
            Ok(Redirect::to(CheckoutStep::Payment.path()).into_response())
        }
        Err(errors) => {
            tracing::debug!(fields = errors.len(), "Shipping form rejected");
            Ok(ShippingTemplate {
                steps: steps(&checkout, CheckoutStep::Shipping),
                methods: method_options(&state, &cart, &form.shipping_method).await,
                summary: summary(&state, &cart, checkout.shipping_method()).await,
                layout: Layout::load(&state, &session).await,
                errors,
                form,
            }
            .into_response())
        }
    }
}

/// Display the payment form.
#[instrument(skip(state, session))]
pub async fn payment_page(State(state): State<AppState>, session: Session) -> Response {
    let (cart, checkout) = match enter(&session, CheckoutStep::Payment).await {
        Ok(entered) => entered,
        Err(redirect) => return redirect.into_response(),
    };

    PaymentTemplate {
        steps: steps(&checkout, CheckoutStep::Payment),
        summary: summary(&state, &cart, checkout.shipping_method()).await,
        layout: Layout::load(&state, &session).await,
        cardholder: String::new(),
        expiry: String::new(),
        errors: FieldErrors::new(),
    }
    .into_response()
}

/// Validate and store the payment step. Only the card brand and last four
/// digits are kept.
#[instrument(skip(state, session, form))]
pub async fn submit_payment(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let (cart, mut checkout) = match enter(&session, CheckoutStep::Payment).await {
        Ok(entered) => entered,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    match form.validate(Utc::now().date_naive()) {
        Ok(payment) => {
            add_breadcrumb(
                "checkout",
                "Payment completed",
                &[("brand", payment.brand.clone())],
            );
            if let Err(e) = checkout.set_payment(payment) {
                flash(&session, Flash::error(e.to_string())).await;
                return Ok(Redirect::to(CheckoutStep::Shipping.path()).into_response());
            }
            save_checkout(&session, &checkout).await?;
            Ok(Redirect::to(CheckoutStep::Review.path()).into_response())
        }
        Err(errors) => Ok(PaymentTemplate {
            steps: steps(&checkout, CheckoutStep::Payment),
            summary: summary(&state, &cart, checkout.shipping_method()).await,
            layout: Layout::load(&state, &session).await,
            cardholder: form.cardholder,
            expiry: form.expiry,
            errors,
        }
        .into_response()),
    }
}

/// Display the review step.
#[instrument(skip(state, session))]
pub async fn review(State(state): State<AppState>, session: Session) -> Response {
    let (cart, checkout) = match enter(&session, CheckoutStep::Review).await {
        Ok(entered) => entered,
        Err(redirect) => return redirect.into_response(),
    };
    let (Some(shipping), Some(payment)) = (&checkout.shipping, &checkout.payment) else {
        return Redirect::to(checkout.current_step().path()).into_response();
    };

    ReviewTemplate {
        steps: steps(&checkout, CheckoutStep::Review),
        email: shipping.email.to_string(),
        address_lines: shipping.address.lines(),
        method: shipping.method.label(),
        payment: payment.display(),
        summary: summary(&state, &cart, shipping.method).await,
        layout: Layout::load(&state, &session).await,
    }
    .into_response()
}

/// Place the order. Payment always succeeds.
#[instrument(skip(state, session, auth))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Redirect> {
    let (mut cart, checkout) = match enter(&session, CheckoutStep::Review).await {
        Ok(entered) => entered,
        Err(redirect) => return Ok(redirect),
    };

    let user_id = auth.0.as_ref().map(|u| u.id);
    let result = OrderRepository::new(state.store())
        .place(&checkout, &mut cart, user_id, Utc::now())
        .await;

    match result {
        Ok(order) => {
            cart.clear();
            save_cart(&session, &cart).await?;
            clear_checkout(&session).await?;
            remember_order(&session, &order.number).await?;
            add_breadcrumb(
                "checkout",
                "Order placed",
                &[("order_number", order.number.clone())],
            );
            Ok(Redirect::to(&format!(
                "/checkout/confirmation/{}",
                order.number
            )))
        }
        Err(e @ (PlaceOrderError::ItemsChanged(_) | PlaceOrderError::CouponRemoved { .. })) => {
            save_cart(&session, &cart).await?;
            flash(&session, Flash::error(e.to_string())).await;
            Ok(Redirect::to("/cart"))
        }
        Err(PlaceOrderError::Checkout(e)) => {
            flash(&session, Flash::error(e.to_string())).await;
            Ok(Redirect::to("/checkout"))
        }
        Err(e @ PlaceOrderError::NumbersExhausted) => Err(AppError::Internal(e.to_string())),
    }
}

/// Display the confirmation page for an order this visitor placed.
#[instrument(skip(state, session, auth))]
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Path(number): Path<String>,
) -> Result<Response> {
    let order = OrderRepository::new(state.store())
        .get_by_number(&number)
        .await
        .ok_or_else(|| AppError::NotFound("that order".to_string()))?;

    if !may_view(&session, &auth, &order).await {
        return Ok(Redirect::to("/orders/track").into_response());
    }

    let view = {
        let dataset = state.store().read().await;
        OrderView::new(&order, &dataset.settings)
    };
    Ok(ConfirmationTemplate {
        layout: Layout::load(&state, &session).await,
        order: view,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use harbor_core::Email;

    #[test]
    fn test_steps_mark_progress() {
        let checkout = Checkout::default();
        let view = steps(&checkout, CheckoutStep::Shipping);
        assert_eq!(view.len(), 3);
        assert!(view[0].current);
        assert!(!view[1].done);

        let dataset = harbor_core::Dataset::seed().unwrap();
        let order = dataset.order_by_number("HP-1001").unwrap();
        let mut checkout = Checkout::default();
        checkout.set_shipping(harbor_core::checkout::ShippingDetails {
            email: Email::parse(&order.email).unwrap(),
            address: order.shipping_address.clone(),
            method: ShippingMethod::Express,
        });
        let view = steps(&checkout, CheckoutStep::Payment);
        assert!(view[0].done);
        assert!(view[1].current);
        assert!(!view[2].done);
    }
}
