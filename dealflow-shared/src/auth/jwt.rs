//! JWT issuance and validation.
//!
//! Tokens are signed with HS256 over a shared secret and carry the subject
//! (user id), issue/expiry timestamps, and a token type. The secret and
//! both TTLs are fixed at construction; issuance defaults are 30 minutes
//! for access tokens and 7 days for refresh tokens.
//!
//! # Failure signal
//!
//! [`TokenService::validate_access`] and [`TokenService::validate_refresh`]
//! return the single opaque [`InvalidToken`] error for every failure: bad
//! signature, malformed payload, expired, missing subject, or wrong token
//! type. Callers map it to an authentication-failure response and learn
//! nothing else.
//!
//! # Example
//!
//! ```
//! use dealflow_shared::auth::jwt::TokenService;
//! use chrono::Duration;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenService::new(
//!     "a-signing-secret-of-at-least-32-bytes!!",
//!     Duration::minutes(30),
//!     Duration::days(7),
//! );
//!
//! let user_id = Uuid::new_v4();
//! let access = tokens.issue_access(user_id)?;
//! assert_eq!(tokens.validate_access(&access)?, user_id);
//! # Ok(())
//! # }
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token validation failure. Deliberately carries no detail about
/// why validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

/// Token type claim: which half of the token pair a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived, presented on every API call
    Access,

    /// Long-lived, exchanged for fresh access tokens
    Refresh,
}

/// JWT claims carried by dealflow tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID
    pub sub: Uuid,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Access or refresh
    pub token_type: TokenType,
}

/// Issues and validates signed, time-limited tokens.
///
/// Construct once at startup from configuration and share behind an `Arc`;
/// all methods take `&self`.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenService {
    /// Creates a token service with the given signing secret and TTLs.
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            validation,
        }
    }

    /// Issues an access token for `user_id`, expiring after the access TTL.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user_id, TokenType::Access, self.access_ttl)
    }

    /// Issues a refresh token for `user_id`, expiring after the refresh TTL.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user_id, TokenType::Refresh, self.refresh_ttl)
    }

    /// Validates an access token and returns its subject.
    pub fn validate_access(&self, token: &str) -> Result<Uuid, InvalidToken> {
        self.validate(token, TokenType::Access)
    }

    /// Validates a refresh token and returns its subject.
    pub fn validate_refresh(&self, token: &str) -> Result<Uuid, InvalidToken> {
        self.validate(token, TokenType::Refresh)
    }

    fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    fn validate(&self, token: &str, expected: TokenType) -> Result<Uuid, InvalidToken> {
        let data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(|_| InvalidToken)?;
        if data.claims.token_type != expected {
            return Err(InvalidToken);
        }
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::minutes(30), Duration::days(7))
    }

    #[test]
    fn test_access_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens.issue_access(user_id).expect("issue");
        assert_eq!(tokens.validate_access(&token), Ok(user_id));
    }

    #[test]
    fn test_refresh_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens.issue_refresh(user_id).expect("issue");
        assert_eq!(tokens.validate_refresh(&token), Ok(user_id));
    }

    #[test]
    fn test_token_type_is_enforced() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let access = tokens.issue_access(user_id).expect("issue");
        let refresh = tokens.issue_refresh(user_id).expect("issue");

        assert_eq!(tokens.validate_refresh(&access), Err(InvalidToken));
        assert_eq!(tokens.validate_access(&refresh), Err(InvalidToken));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let tokens = service();
        let other = TokenService::new(
            "another-secret-key-that-is-also-32-bytes",
            Duration::minutes(30),
            Duration::days(7),
        );

        let token = tokens.issue_access(Uuid::new_v4()).expect("issue");
        assert_eq!(other.validate_access(&token), Err(InvalidToken));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Negative TTL produces a token that expired in the past, well
        // beyond the default validation leeway.
        let tokens = TokenService::new(SECRET, Duration::hours(-1), Duration::days(7));
        let token = tokens.issue_access(Uuid::new_v4()).expect("issue");

        let fresh = service();
        assert_eq!(fresh.validate_access(&token), Err(InvalidToken));
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = service();
        assert_eq!(tokens.validate_access(""), Err(InvalidToken));
        assert_eq!(tokens.validate_access("not.a.jwt"), Err(InvalidToken));

        // Tampered payload
        let token = tokens.issue_access(Uuid::new_v4()).expect("issue");
        let mut parts: Vec<&str> = token.split('.').collect();
        let tampered_payload = "eyJzdWIiOiJ4In0";
        parts[1] = tampered_payload;
        let tampered = parts.join(".");
        assert_eq!(tokens.validate_access(&tampered), Err(InvalidToken));
    }

    #[test]
    fn test_expired_and_forged_are_indistinguishable() {
        let expired_issuer = TokenService::new(SECRET, Duration::hours(-1), Duration::days(7));
        let forged_issuer = TokenService::new(
            "another-secret-key-that-is-also-32-bytes",
            Duration::minutes(30),
            Duration::days(7),
        );
        let tokens = service();

        let expired = expired_issuer.issue_access(Uuid::new_v4()).expect("issue");
        let forged = forged_issuer.issue_access(Uuid::new_v4()).expect("issue");

        assert_eq!(
            tokens.validate_access(&expired),
            tokens.validate_access(&forged)
        );
    }
}
