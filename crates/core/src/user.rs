//! Store users: shoppers and admins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::Address;
use crate::types::{UserId, UserRole};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Uppercase initials for avatar badges.
    #[must_use]
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        let user = User {
            id: UserId::new(1),
            email: "ana@example.com".to_owned(),
            first_name: "ana".to_owned(),
            last_name: "Reyes".to_owned(),
            role: UserRole::Customer,
            phone: None,
            addresses: Vec::new(),
            created_at: Utc::now(),
        };
        assert_eq!(user.full_name(), "ana Reyes");
        assert_eq!(user.initials(), "AR");
        assert!(!user.is_admin());
    }
}
