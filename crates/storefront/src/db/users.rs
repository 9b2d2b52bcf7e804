//! User repository.
//!
//! Accounts are simulated: a shopper "signs in" with the email of an
//! existing customer and registration just appends a record.

use chrono::{DateTime, Utc};

use harbor_core::user::User;
use harbor_core::{Email, UserId, UserRole, next_id};

use super::{RepositoryError, Store};

/// Data for a new customer account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Get a user by their email address.
    pub async fn get_by_email(&self, email: &Email) -> Option<User> {
        self.store
            .read()
            .await
            .user_by_email(email.as_str())
            .cloned()
    }

    /// Get a user by their ID.
    pub async fn get_by_id(&self, id: UserId) -> Option<User> {
        self.store.read().await.user(id).cloned()
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create(
        &self,
        new_user: NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut dataset = self.store.write().await;
        if dataset.user_by_email(new_user.email.as_str()).is_some() {
            return Err(RepositoryError::Conflict(format!(
                "email {} is already registered",
                new_user.email
            )));
        }

        let user = User {
            id: next_id(dataset.users.iter().map(|u| u.id)),
            email: new_user.email.into_inner(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: UserRole::Customer,
            phone: None,
            addresses: Vec::new(),
            created_at: now,
        };
        dataset.users.push(user.clone());
        drop(dataset);

        tracing::info!(user_id = %user.id, "Customer account created");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            first_name: "Mara".to_string(),
            last_name: "Quinn".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = Store::load(None).unwrap();
        let repo = UserRepository::new(&store);

        let user = repo
            .create(new_user("mara@example.com"), Utc::now())
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Customer);

        let found = repo
            .get_by_email(&Email::parse("MARA@example.com").unwrap())
            .await
            .unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.get_by_id(user.id).await.is_some());
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let store = Store::load(None).unwrap();
        let repo = UserRepository::new(&store);

        let result = repo.create(new_user("ana@example.com"), Utc::now()).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}
