//! Request extractors: the authenticated caller, the organization
//! context header, and pagination query parameters.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use dealflow_shared::models::user::User;
use dealflow_shared::store::Page;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Header naming the organization a tenant-scoped request operates on.
pub const ORG_HEADER: &str = "x-organization-id";

/// The authenticated user, inserted by the bearer-auth middleware.
/// Extracting it on a route outside the middleware is a 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing authentication".to_string()))
    }
}

/// Organization context, taken from the `X-Organization-Id` header. The
/// header names which tenant the request targets; whether the caller may
/// touch that tenant is decided by the service layer, not here.
#[derive(Debug, Clone, Copy)]
pub struct OrgId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OrgId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ORG_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::BadRequest("X-Organization-Id header is required".to_string())
            })?;
        let id = value.parse::<Uuid>().map_err(|_| {
            ApiError::BadRequest("X-Organization-Id must be a UUID".to_string())
        })?;
        Ok(OrgId(id))
    }
}

/// `?skip=` and `?limit=` query parameters for list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Clamped page: non-negative skip, limit between 1 and 100.
    pub fn page(&self) -> Page {
        Page {
            skip: self.skip.unwrap_or(0).max(0),
            limit: self.limit.unwrap_or(100).clamp(1, 100),
        }
    }
}
