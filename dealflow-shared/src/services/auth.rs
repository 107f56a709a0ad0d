//! Registration, login, token refresh, and the caller's organization list.
//!
//! Login and refresh both answer with an access/refresh token pair. A
//! failed login is always [`ServiceError::InvalidCredentials`], whether the
//! email is unknown or the password wrong; the two cases are not
//! distinguishable from outside.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::TokenService;
use crate::auth::password::{hash_password, verify_password};
use crate::models::membership::Role;
use crate::models::organization::Organization;
use crate::models::user::User;
use crate::store::{Store, StoreError};

use super::{ServiceError, ServiceResult};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// An access/refresh token pair, as returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// An organization the caller belongs to, with their role in it.
#[derive(Debug, Clone, Serialize)]
pub struct UserOrganization {
    pub organization: Organization,
    pub role: Role,
}

/// Account and session operations.
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Registers a new user. The password is hashed before it touches the
    /// store; the plaintext is never persisted. The email is stored as
    /// given; lookups match it byte for byte.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> ServiceResult<User> {
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation("invalid email address".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if full_name.trim().is_empty() {
            return Err(ServiceError::Validation("full name is required".into()));
        }

        let password_hash = hash_password(password)?;
        let user = User::new(email, password_hash, full_name.trim().to_string());
        match self.store.insert_user(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "user registered");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => Err(ServiceError::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up a user by exact email match and verifies the password.
    /// `None` covers both an unknown email and a wrong password; the two
    /// cases are not distinguishable from outside.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Option<User>> {
        let Some(user) = self.store.user_by_email(email).await? else {
            return Ok(None);
        };
        if !verify_password(password, &user.password_hash)? {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Verifies credentials and issues a token pair.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(User, TokenPair)> {
        let user = self
            .authenticate(email, password)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;
        let pair = self.issue_pair(user.id)?;
        Ok((user, pair))
    }

    /// Exchanges a valid refresh token for a fresh token pair. The token
    /// must be of refresh type and its subject must still exist.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let user_id = self.tokens.validate_refresh(refresh_token)?;
        if self.store.user_by_id(user_id).await?.is_none() {
            return Err(crate::auth::jwt::InvalidToken.into());
        }
        Ok(self.issue_pair(user_id)?)
    }

    /// Looks up a user by id. Used by the API's bearer-token middleware.
    pub async fn user(&self, user_id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.store.user_by_id(user_id).await?)
    }

    /// Lists the organizations the user belongs to, with their role in
    /// each.
    pub async fn organizations_for(&self, user_id: Uuid) -> ServiceResult<Vec<UserOrganization>> {
        let memberships = self.store.memberships_by_user(user_id).await?;
        let mut out = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(organization) = self
                .store
                .organization_by_id(membership.organization_id)
                .await?
            {
                out.push(UserOrganization {
                    organization,
                    role: membership.role,
                });
            }
        }
        Ok(out)
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, ServiceError> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access(user_id)?,
            refresh_token: self.tokens.issue_refresh(user_id)?,
            token_type: "bearer",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn service() -> AuthService {
        let tokens = TokenService::new(
            "test-secret-key-at-least-32-bytes-long",
            Duration::minutes(30),
            Duration::days(7),
        );
        AuthService::new(Arc::new(MemoryStore::new()), Arc::new(tokens))
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let user = auth
            .register("ada@example.com", "long-enough", "Ada Lovelace")
            .await
            .expect("register");
        assert_eq!(user.email, "ada@example.com");

        let (logged_in, pair) = auth
            .login("ada@example.com", "long-enough")
            .await
            .expect("login");
        assert_eq!(logged_in.id, user.id);
        assert_eq!(pair.token_type, "bearer");
    }

    #[tokio::test]
    async fn test_email_matching_is_exact() {
        let auth = service();
        auth.register("Ada@example.com", "long-enough", "Ada")
            .await
            .expect("register");

        // A differently cased spelling is a different account.
        let other = auth
            .register("ada@example.com", "long-enough", "Ada")
            .await
            .expect("register");
        assert_eq!(other.email, "ada@example.com");

        assert!(auth
            .authenticate("Ada@example.com", "long-enough")
            .await
            .expect("authenticate")
            .is_some());
        assert!(auth
            .authenticate("ADA@EXAMPLE.COM", "long-enough")
            .await
            .expect("authenticate")
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let auth = service();
        auth.register("dup@example.com", "long-enough", "First")
            .await
            .expect("register");
        assert!(matches!(
            auth.register("dup@example.com", "long-enough", "Second")
                .await,
            Err(ServiceError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_weak_inputs_rejected() {
        let auth = service();
        assert!(matches!(
            auth.register("not-an-email", "long-enough", "X").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            auth.register("x@example.com", "short", "X").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            auth.register("x@example.com", "long-enough", "  ").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_uniform() {
        let auth = service();
        auth.register("ada@example.com", "long-enough", "Ada")
            .await
            .expect("register");

        // Unknown email and wrong password produce the same outcome.
        assert!(auth
            .authenticate("nobody@example.com", "long-enough")
            .await
            .expect("authenticate")
            .is_none());
        assert!(auth
            .authenticate("ada@example.com", "wrong-password")
            .await
            .expect("authenticate")
            .is_none());
        assert!(matches!(
            auth.login("nobody@example.com", "long-enough").await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("ada@example.com", "wrong-password").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let auth = service();
        auth.register("ada@example.com", "long-enough", "Ada")
            .await
            .expect("register");
        let (_, pair) = auth
            .login("ada@example.com", "long-enough")
            .await
            .expect("login");

        assert!(auth.refresh(&pair.refresh_token).await.is_ok());
        assert!(matches!(
            auth.refresh(&pair.access_token).await,
            Err(ServiceError::InvalidToken(_))
        ));
    }
}
