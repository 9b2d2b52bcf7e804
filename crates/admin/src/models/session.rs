//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state, plus the one-shot
//! flash message shown after a form post.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use harbor_core::user::User;
use harbor_core::{Email, UserId};

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify the logged-in admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's dataset ID.
    pub id: UserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
}

impl CurrentAdmin {
    /// Identity for an admin-role user. `None` for customers and for records
    /// with an invalid email.
    #[must_use]
    pub fn from_user(user: &User) -> Option<Self> {
        if !user.is_admin() {
            return None;
        }
        Some(Self {
            id: user.id,
            email: Email::parse(&user.email).ok()?,
            name: user.full_name(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "alert alert-success",
            Self::Error => "alert alert-error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}

/// Queue a flash message for the next page. Failures are logged only.
pub async fn flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending flash message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(keys::FLASH).await.ok().flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use harbor_core::UserRole;
    use tower_sessions::MemoryStore;

    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new(7),
            email: "ops@harborandpine.test".to_string(),
            first_name: "Rowan".to_string(),
            last_name: "Hale".to_string(),
            role,
            phone: None,
            addresses: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_admins_get_an_identity() {
        let admin = CurrentAdmin::from_user(&user(UserRole::Admin)).unwrap();
        assert_eq!(admin.name, "Rowan Hale");
        assert!(CurrentAdmin::from_user(&user(UserRole::Customer)).is_none());
    }

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        flash(&session, Flash::error("Nope")).await;

        let shown = take_flash(&session).await.unwrap();
        assert_eq!(shown.kind.css_class(), "alert alert-error");
        assert!(take_flash(&session).await.is_none());
    }
}
