//! User accounts.
//!
//! Users authenticate with an email and password; only the Argon2id hash of
//! the password is ever stored. Emails are unique and matched on the exact
//! stored value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// User ID
    pub id: Uuid,

    /// Email address (unique)
    pub email: String,

    /// Argon2id hash of the password (PHC string format)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a new user record with a fresh id and timestamp.
    ///
    /// `password_hash` must already be hashed; this type never sees
    /// plaintext passwords.
    pub fn new(email: impl Into<String>, password_hash: String, full_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash,
            full_name: full_name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_unique_id() {
        let a = User::new("a@example.com", "$argon2id$...".to_string(), "A");
        let b = User::new("a@example.com", "$argon2id$...".to_string(), "A");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@example.com", "$argon2id$secret".to_string(), "A");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("a@example.com"));
    }
}
