//! Domain services: every operation the API exposes, with its access
//! rules applied.
//!
//! Services are thin stateless wrappers around an `Arc<dyn Store>`. Each
//! gated operation runs the same sequence:
//!
//! 1. Resolve the caller's membership in the target organization; no
//!    membership is [`ServiceError::AccessDenied`].
//! 2. Check the membership's role against the operation's requirement;
//!    an insufficient role is [`ServiceError::InsufficientPermission`].
//! 3. Validate input.
//! 4. Fetch the target record. A record that exists but belongs to a
//!    different organization is treated exactly like a missing one
//!    (`Ok(None)` or `Ok(false)`), so callers cannot probe other tenants'
//!    record ids.
//! 5. Mutate, with any activity row committed atomically alongside.
//!
//! The one role rule that depends on record state (a `member` may update a
//! task assigned to them) is checked after the fetch, in the task service.

pub mod activity;
pub mod analytics;
pub mod auth;
pub mod contact;
pub mod deal;
pub mod organization;
pub mod task;

use uuid::Uuid;

use crate::auth::password::PasswordError;
use crate::models::membership::Membership;
use crate::store::{Store, StoreError};

/// Error type for service operations. The API layer maps each variant to a
/// status code; the variants carry the distinctions that mapping needs.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller is not a member of the target organization
    #[error("not a member of this organization")]
    AccessDenied,

    /// Caller is a member but their role does not permit the operation
    #[error("insufficient permissions")]
    InsufficientPermission,

    /// Email/password pair did not match a user
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Input failed validation
    #[error("{0}")]
    Validation(String),

    /// A user with this email already exists
    #[error("email already registered")]
    AlreadyExists,

    /// The user is already a member of the organization
    #[error("user is already a member")]
    AlreadyMember,

    /// Role string outside the closed set
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Deal is already closed
    #[error("deal is already closed")]
    AlreadyClosed,

    /// Task is already completed
    #[error("task is already completed")]
    AlreadyCompleted,

    /// Token issuance failed
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Presented token failed validation
    #[error(transparent)]
    InvalidToken(#[from] crate::auth::jwt::InvalidToken),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service result type alias.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// The membership gate every tenant-scoped operation starts with.
pub(crate) async fn require_membership(
    store: &dyn Store,
    organization_id: Uuid,
    user_id: Uuid,
) -> ServiceResult<Membership> {
    store
        .membership(organization_id, user_id)
        .await?
        .ok_or(ServiceError::AccessDenied)
}
