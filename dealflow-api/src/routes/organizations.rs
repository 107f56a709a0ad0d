//! Organization and membership endpoints.
//!
//! # Endpoints
//!
//! - `GET  /api/v1/organizations` - Organizations the caller belongs to
//! - `POST /api/v1/organizations` - Create an organization (caller becomes owner)
//! - `GET  /api/v1/organizations/:id` - Fetch one organization (members only)
//! - `GET  /api/v1/organizations/:id/members` - List members
//! - `POST /api/v1/organizations/:id/members` - Add a member (owner/admin)
//!
//! The organization is named in the path here, not in the
//! `X-Organization-Id` header the entity routes use; membership routes are
//! how a caller obtains that header value in the first place.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dealflow_shared::models::membership::Membership;
use dealflow_shared::models::organization::Organization;
use dealflow_shared::services::auth::{AuthService, UserOrganization};
use dealflow_shared::services::organization::OrganizationService;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentUser;

/// Create organization request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

/// Add member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    /// One of `owner`, `admin`, `manager`, `member`
    pub role: String,
}

/// `GET /api/v1/organizations`
pub async fn list_organizations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<UserOrganization>>> {
    let orgs = AuthService::new(state.store.clone(), state.tokens.clone())
        .organizations_for(user.id)
        .await?;
    Ok(Json(orgs))
}

/// `POST /api/v1/organizations`
pub async fn create_organization(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    body.validate()?;
    let org = OrganizationService::new(state.store.clone())
        .create_organization(user.id, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(org)))
}

/// `GET /api/v1/organizations/:id`
///
/// # Errors
///
/// - `403 Forbidden`: caller is not a member of the named organization
pub async fn get_organization(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Organization>> {
    let org = OrganizationService::new(state.store.clone())
        .organization(org_id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;
    Ok(Json(org))
}

/// `GET /api/v1/organizations/:id/members`
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Membership>>> {
    let members = OrganizationService::new(state.store.clone())
        .members(org_id, user.id)
        .await?;
    Ok(Json(members))
}

/// `POST /api/v1/organizations/:id/members`
///
/// # Errors
///
/// - `403 Forbidden`: caller is not a member, or not owner/admin
/// - `400 Bad Request`: role outside owner/admin/manager/member
/// - `404 Not Found`: target user does not exist
/// - `409 Conflict`: target user is already a member
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(org_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    let membership = OrganizationService::new(state.store.clone())
        .add_member(org_id, user.id, body.user_id, &body.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok((StatusCode::CREATED, Json(membership)))
}
