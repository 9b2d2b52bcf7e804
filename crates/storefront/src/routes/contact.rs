//! Contact form route handlers.
//!
//! Messages are validated and logged for the support team; there is no
//! mail delivery.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::Email;
use harbor_core::order::normalize_order_number;
use harbor_core::validation::FieldErrors;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::models::session::flash;
use crate::state::AppState;
use crate::views::Layout;

/// Longest accepted message.
const MAX_MESSAGE_LEN: usize = 5_000;

/// Contact form data.
#[derive(Debug, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub message: String,
}

/// A validated message.
#[derive(Debug)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub order_number: Option<String>,
    pub message: String,
}

impl ContactForm {
    fn validate(&self) -> std::result::Result<ContactMessage, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.require("name", "Name", &self.name);
        let message = errors.require("message", "Message", &self.message);
        if message.chars().count() > MAX_MESSAGE_LEN {
            errors.add(
                "message",
                format!("Message must be at most {MAX_MESSAGE_LEN} characters"),
            );
        }
        let email = Email::parse(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        let order_number = Some(self.order_number.trim())
            .filter(|n| !n.is_empty())
            .map(normalize_order_number);

        match email {
            Some(email) if errors.is_empty() => Ok(ContactMessage {
                name,
                email,
                order_number,
                message,
            }),
            _ => Err(errors),
        }
    }
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
    pub form: ContactForm,
    pub errors: FieldErrors,
}

/// Display the contact form, pre-filled for signed-in shoppers.
#[instrument(skip(state, session, auth))]
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> ContactTemplate {
    let form = auth.0.map_or_else(ContactForm::default, |user| ContactForm {
        name: user.first_name,
        email: user.email.into_inner(),
        ..ContactForm::default()
    });

    ContactTemplate {
        layout: Layout::load(&state, &session).await,
        form,
        errors: FieldErrors::new(),
    }
}

/// Handle a contact form submission.
#[instrument(skip(state, session, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    match form.validate() {
        Ok(message) => {
            tracing::info!(
                email = %message.email,
                name = %message.name,
                order_number = message.order_number.as_deref().unwrap_or("-"),
                length = message.message.len(),
                "Contact message received"
            );
            add_breadcrumb("contact", "Message sent", &[]);
            flash(
                &session,
                Flash::success("Thanks for getting in touch. We'll reply within one business day."),
            )
            .await;
            Ok(Redirect::to("/contact").into_response())
        }
        Err(errors) => {
            let page = ContactTemplate {
                layout: Layout::load(&state, &session).await,
                form,
                errors,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_form_validation() {
        let form = ContactForm {
            name: "Mara".to_string(),
            email: "mara@".to_string(),
            order_number: String::new(),
            message: "  ".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("message"));
        assert!(!errors.has("name"));

        let form = ContactForm {
            name: "Mara".to_string(),
            email: "mara@example.com".to_string(),
            order_number: "1004".to_string(),
            message: "Where is my tote?".to_string(),
        };
        let message = form.validate().unwrap();
        assert_eq!(message.order_number.as_deref(), Some("HP-1004"));
    }
}
