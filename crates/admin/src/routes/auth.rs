//! Authentication route handlers for admin.
//!
//! Sign-in is simulated: any admin-role user in the dataset may sign in
//! with their email address. There are no passwords.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginPageTemplate {
    pub store_name: String,
    pub email: String,
    pub error: Option<String>,
}

impl LoginPageTemplate {
    async fn new(state: &AppState, email: String, error: Option<String>) -> Self {
        Self {
            store_name: state.store().read().await.settings.store_name.clone(),
            email,
            error,
        }
    }
}

/// Render the login page, or go to the dashboard if already signed in.
///
/// GET /auth/login
#[instrument(skip_all)]
async fn login_page(State(state): State<AppState>, auth: OptionalAdminAuth) -> Response {
    if auth.0.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginPageTemplate::new(&state, String::new(), None)
        .await
        .into_response()
}

/// Sign in as the admin-role user with the posted email.
///
/// POST /auth/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let admin = state
        .store()
        .read()
        .await
        .user_by_email(&form.email)
        .and_then(CurrentAdmin::from_user);

    let Some(admin) = admin else {
        tracing::warn!("Admin sign-in refused");
        let page = LoginPageTemplate::new(
            &state,
            form.email,
            Some("No admin account uses that email address.".to_string()),
        )
        .await;
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    };

    set_current_admin(&session, &admin).await?;
    tracing::info!(admin_id = %admin.id, "Admin signed in");
    Ok(Redirect::to("/").into_response())
}

/// Logout and clear session.
///
/// POST /auth/logout
#[instrument(skip_all)]
async fn logout(session: Session) -> Result<Redirect> {
    clear_current_admin(&session).await?;
    Ok(Redirect::to("/auth/login"))
}
