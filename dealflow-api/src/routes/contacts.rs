//! Contact endpoints.
//!
//! # Endpoints
//!
//! - `POST   /api/v1/contacts` - Create contact (any member)
//! - `GET    /api/v1/contacts` - List contacts, paginated
//! - `GET    /api/v1/contacts/:id` - Fetch one contact
//! - `PATCH  /api/v1/contacts/:id` - Partial update (manager and above)
//! - `DELETE /api/v1/contacts/:id` - Delete (owner/admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dealflow_shared::models::contact::{Contact, CreateContact, UpdateContact};
use dealflow_shared::services::contact::ContactService;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentUser, OrgId, Pagination};

fn not_found() -> ApiError {
    ApiError::NotFound("Contact not found".to_string())
}

/// `POST /api/v1/contacts`
pub async fn create_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Json(body): Json<CreateContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = ContactService::new(state.store.clone())
        .create_contact(org_id, user.id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// `GET /api/v1/contacts`
pub async fn list_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = ContactService::new(state.store.clone())
        .contacts(org_id, user.id, pagination.page())
        .await?;
    Ok(Json(contacts))
}

/// `GET /api/v1/contacts/:id`
///
/// A contact belonging to another organization is a 404, identical to an
/// unknown id.
pub async fn get_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Contact>> {
    let contact = ContactService::new(state.store.clone())
        .contact(org_id, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(contact))
}

/// `PATCH /api/v1/contacts/:id`
pub async fn update_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateContact>,
) -> ApiResult<Json<Contact>> {
    let contact = ContactService::new(state.store.clone())
        .update_contact(org_id, user.id, id, body)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(contact))
}

/// `DELETE /api/v1/contacts/:id`
pub async fn delete_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = ContactService::new(state.store.clone())
        .delete_contact(org_id, user.id, id)
        .await?;
    if !deleted {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
