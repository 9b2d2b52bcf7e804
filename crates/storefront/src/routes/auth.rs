//! Authentication route handlers.
//!
//! Sign-in is simulated: entering the email of an existing customer signs
//! that customer in. Registration creates a customer record in the
//! in-memory store and signs the new customer in straight away.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::Email;
use harbor_core::validation::FieldErrors;

use crate::db::users::NewUser;
use crate::db::{RepositoryError, UserRepository};
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::models::session::flash;
use crate::routes::local_path;
use crate::state::AppState;
use crate::views::Layout;

// =============================================================================
// Form Types
// =============================================================================

/// Where to go after signing in.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub next: Option<String>,
}

impl RegisterForm {
    fn validate(&self) -> std::result::Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        let first_name = errors.require("first_name", "First name", &self.first_name);
        let last_name = errors.require("last_name", "Last name", &self.last_name);
        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.add("email", e.to_string());
                None
            }
        };

        match email {
            Some(email) if errors.is_empty() => Ok(NewUser {
                email,
                first_name,
                last_name,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub form: RegisterForm,
    pub next: String,
    pub errors: FieldErrors,
}

async fn sign_in(session: &Session, user: &CurrentUser) -> Result<()> {
    set_current_user(session, user).await?;
    set_sentry_user(user);
    add_breadcrumb("auth", "Signed in", &[("user_id", user.id.to_string())]);
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> LoginTemplate {
    LoginTemplate {
        layout: Layout::load(&state, &session).await,
        email: String::new(),
        next: local_path(query.next.as_deref(), "/account"),
        error: None,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = local_path(form.next.as_deref(), "/account");

    let user = match Email::parse(&form.email) {
        Ok(email) => UserRepository::new(state.store()).get_by_email(&email).await,
        Err(_) => None,
    };
    let Some(current) = user.as_ref().and_then(CurrentUser::from_user) else {
        tracing::info!("Login refused for unknown email");
        let page = LoginTemplate {
            layout: Layout::load(&state, &session).await,
            email: form.email,
            next,
            error: Some("No account found for that email address.".to_string()),
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    };

    sign_in(&session, &current).await?;
    flash(
        &session,
        Flash::success(format!("Welcome back, {}.", current.first_name)),
    )
    .await;
    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(state, session))]
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> RegisterTemplate {
    RegisterTemplate {
        layout: Layout::load(&state, &session).await,
        form: RegisterForm::default(),
        next: local_path(query.next.as_deref(), "/account"),
        errors: FieldErrors::new(),
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let next = local_path(form.next.as_deref(), "/account");

    let created = match form.validate() {
        Ok(new_user) => match UserRepository::new(state.store())
            .create(new_user, Utc::now())
            .await
        {
            Ok(user) => Ok(user),
            Err(RepositoryError::Conflict(_)) => {
                let mut errors = FieldErrors::new();
                errors.add("email", "An account with this email already exists.");
                Err(errors)
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => Err(errors),
    };

    match created.map(|user| CurrentUser::from_user(&user)) {
        Ok(Some(current)) => {
            sign_in(&session, &current).await?;
            flash(
                &session,
                Flash::success(format!("Welcome to the shop, {}.", current.first_name)),
            )
            .await;
            Ok(Redirect::to(&next).into_response())
        }
        Ok(None) => Ok(Redirect::to("/auth/login").into_response()),
        Err(errors) => {
            let page = RegisterTemplate {
                layout: Layout::load(&state, &session).await,
                form,
                next,
                errors,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Sign out. The cart stays in the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    flash(&session, Flash::info("You have been signed out.")).await;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_form_validation() {
        let form = RegisterForm {
            email: "not-an-email".to_string(),
            first_name: " ".to_string(),
            last_name: "Quinn".to_string(),
            next: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("first_name"));
        assert!(!errors.has("last_name"));

        let form = RegisterForm {
            email: "Mara@Example.com".to_string(),
            first_name: "Mara".to_string(),
            last_name: "Quinn".to_string(),
            next: None,
        };
        let new_user = form.validate().unwrap();
        assert_eq!(new_user.email.as_str(), "mara@example.com");
    }
}
