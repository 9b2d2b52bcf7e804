//! Store settings routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::CurrencyCode;
use harbor_core::settings::SettingsForm;
use harbor_core::validation::FieldErrors;

use crate::db::settings::{get_settings, update_settings};
use crate::middleware::RequireAdminAuth;
use crate::models::session::flash;
use crate::models::{CurrentAdmin, Flash};
use crate::state::AppState;
use crate::views::{Layout, SelectOption};

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(edit).post(save))
}

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub layout: Layout,
    pub form: SettingsForm,
    pub errors: FieldErrors,
    pub currencies: Vec<SelectOption>,
}

impl SettingsTemplate {
    async fn render(
        state: &AppState,
        session: &Session,
        admin: CurrentAdmin,
        form: SettingsForm,
        errors: FieldErrors,
    ) -> Self {
        let currencies = CurrencyCode::ALL
            .iter()
            .map(|c| {
                SelectOption::new(
                    c.code(),
                    format!("{} ({})", c.code(), c.symbol()),
                    &form.currency,
                )
            })
            .collect();
        Self {
            layout: Layout::load(state, session, admin, "/settings").await,
            form,
            errors,
            currencies,
        }
    }
}

/// GET /settings
#[instrument(skip_all)]
async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> SettingsTemplate {
    let form = SettingsForm::from_settings(&get_settings(state.store()).await);
    SettingsTemplate::render(&state, &session, admin, form, FieldErrors::new()).await
}

/// POST /settings
#[instrument(skip_all, fields(admin_id))]
async fn save(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Response {
    tracing::Span::current().record("admin_id", tracing::field::display(admin.id));
    match form.validate() {
        Ok(settings) => {
            update_settings(state.store(), settings).await;
            flash(&session, Flash::success("Settings saved.")).await;
            Redirect::to("/settings").into_response()
        }
        Err(errors) => {
            let page = SettingsTemplate::render(&state, &session, admin, form, errors).await;
            (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use harbor_core::Dataset;
    use tower::ServiceExt;

    use crate::config::AdminConfig;
    use crate::db::Store;

    use super::*;

    #[tokio::test]
    async fn test_settings_require_sign_in() {
        let state = AppState::with_parts(
            AdminConfig::default(),
            Store::new(Dataset::seed().unwrap()),
        );
        let app = crate::app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/settings")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("store_name=Nope"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/auth/login");
    }
}
