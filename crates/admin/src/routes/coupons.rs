//! Coupon route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::CouponId;
use harbor_core::coupon::Coupon;
use harbor_core::settings::StoreSettings;
use harbor_core::validation::FieldErrors;

use crate::db::CouponRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::session::flash;
use crate::models::{CouponForm, CurrentAdmin, Flash};
use crate::state::AppState;
use crate::views::{Layout, format_date};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(index))
        .route("/coupons/new", get(new_page).post(create))
        .route("/coupons/{id}/edit", get(edit_page).post(update))
        .route("/coupons/{id}/deactivate", post(deactivate))
        .route("/coupons/{id}/delete", post(delete))
}

pub struct CouponRowView {
    pub id: i32,
    pub code: String,
    pub description: String,
    pub discount: String,
    pub min_subtotal: Option<String>,
    /// "3 / 100" or "3".
    pub usage: String,
    pub starts_at: Option<String>,
    pub expires_at: Option<String>,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub active: bool,
}

impl CouponRowView {
    fn new(coupon: &Coupon, settings: &StoreSettings) -> Self {
        let status = coupon.status(Utc::now());
        Self {
            id: coupon.id.as_i32(),
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            discount: coupon.discount.describe(settings.currency),
            min_subtotal: coupon.min_subtotal.map(|m| settings.money(m)),
            usage: match coupon.usage_limit {
                Some(limit) => format!("{} / {limit}", coupon.times_used),
                None => coupon.times_used.to_string(),
            },
            starts_at: coupon.starts_at.map(format_date),
            expires_at: coupon.expires_at.map(format_date),
            status_label: status.label(),
            status_class: status.badge_class(),
            active: coupon.active,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsIndexTemplate {
    pub layout: Layout,
    pub coupons: Vec<CouponRowView>,
}

/// GET /coupons
#[instrument(skip_all)]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> CouponsIndexTemplate {
    let coupons = {
        let dataset = state.store().read().await;
        let mut coupons: Vec<&Coupon> = dataset.coupons.iter().collect();
        coupons.sort_by(|a, b| a.code.cmp(&b.code));
        coupons
            .into_iter()
            .map(|c| CouponRowView::new(c, &dataset.settings))
            .collect()
    };
    CouponsIndexTemplate {
        layout: Layout::load(&state, &session, admin, "/coupons").await,
        coupons,
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/form.html")]
pub struct CouponFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub action: String,
    /// Set when editing.
    pub coupon_id: Option<i32>,
    pub times_used: u32,
    pub form: CouponForm,
    pub errors: FieldErrors,
}

impl CouponFormTemplate {
    async fn render_for(
        state: &AppState,
        session: &Session,
        admin: CurrentAdmin,
        coupon: Option<&Coupon>,
        form: CouponForm,
        errors: FieldErrors,
    ) -> Self {
        let (title, action) = match coupon {
            Some(c) => (format!("Edit {}", c.code), format!("/coupons/{}/edit", c.id)),
            None => ("New coupon".to_string(), "/coupons/new".to_string()),
        };
        Self {
            layout: Layout::load(state, session, admin, &action).await,
            title,
            action,
            coupon_id: coupon.map(|c| c.id.as_i32()),
            times_used: coupon.map_or(0, |c| c.times_used),
            form,
            errors,
        }
    }
}

/// GET /coupons/new
#[instrument(skip_all)]
async fn new_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> CouponFormTemplate {
    CouponFormTemplate::render_for(
        &state,
        &session,
        admin,
        None,
        CouponForm::new_coupon(),
        FieldErrors::new(),
    )
    .await
}

/// POST /coupons/new
#[instrument(skip_all)]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let validated = form.validate(&state.store().read().await.coupons, None);
    let input = match validated {
        Ok(input) => input,
        Err(errors) => {
            let page =
                CouponFormTemplate::render_for(&state, &session, admin, None, form, errors).await;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let coupon = CouponRepository::new(state.store()).create(input).await?;
    tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
    flash(&session, Flash::success(format!("Created coupon {}.", coupon.code))).await;
    Ok(Redirect::to("/coupons").into_response())
}

/// GET /coupons/{id}/edit
#[instrument(skip(admin, state, session))]
async fn edit_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CouponId>,
) -> Result<CouponFormTemplate> {
    let coupon = CouponRepository::new(state.store())
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("coupon".to_string()))?;
    let form = CouponForm::from_coupon(&coupon);
    let errors = FieldErrors::new();
    Ok(
        CouponFormTemplate::render_for(&state, &session, admin, Some(&coupon), form, errors)
            .await,
    )
}

/// POST /coupons/{id}/edit
#[instrument(skip(admin, state, session, form))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CouponId>,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let (coupon, validated) = {
        let dataset = state.store().read().await;
        let coupon = dataset
            .coupon(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("coupon".to_string()))?;
        (coupon, form.validate(&dataset.coupons, Some(id)))
    };
    let input = match validated {
        Ok(input) => input,
        Err(errors) => {
            let page =
                CouponFormTemplate::render_for(&state, &session, admin, Some(&coupon), form, errors)
                    .await;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let coupon = CouponRepository::new(state.store()).update(id, input).await?;
    tracing::info!(coupon_id = %id, code = %coupon.code, "Coupon updated");
    flash(&session, Flash::success(format!("Saved coupon {}.", coupon.code))).await;
    Ok(Redirect::to("/coupons").into_response())
}

/// POST /coupons/{id}/deactivate
#[instrument(skip(_admin, state, session))]
async fn deactivate(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CouponId>,
) -> Result<Redirect> {
    let coupon = CouponRepository::new(state.store()).deactivate(id).await?;
    tracing::info!(coupon_id = %id, code = %coupon.code, "Coupon deactivated");
    flash(&session, Flash::success(format!("{} is no longer active.", coupon.code))).await;
    Ok(Redirect::to("/coupons"))
}

/// POST /coupons/{id}/delete
#[instrument(skip(_admin, state, session))]
async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CouponId>,
) -> Result<Redirect> {
    let coupon = CouponRepository::new(state.store()).delete(id).await?;
    tracing::info!(coupon_id = %id, code = %coupon.code, "Coupon deleted");
    flash(&session, Flash::success(format!("Deleted coupon {}.", coupon.code))).await;
    Ok(Redirect::to("/coupons"))
}
