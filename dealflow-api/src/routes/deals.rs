//! Deal endpoints.
//!
//! # Endpoints
//!
//! - `POST   /api/v1/deals` - Create deal (any member)
//! - `GET    /api/v1/deals` - List deals, paginated
//! - `GET    /api/v1/deals/:id` - Fetch one deal
//! - `PATCH  /api/v1/deals/:id` - Partial update (manager and above)
//! - `POST   /api/v1/deals/:id/close` - Close (manager and above, terminal)
//! - `DELETE /api/v1/deals/:id` - Delete (owner/admin)
//!
//! A deal's activity trail is read through `GET /api/v1/activities` with
//! the `deal_id` filter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dealflow_shared::models::deal::{CreateDeal, Deal, UpdateDeal};
use dealflow_shared::services::deal::DealService;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentUser, OrgId, Pagination};

fn not_found() -> ApiError {
    ApiError::NotFound("Deal not found".to_string())
}

/// `POST /api/v1/deals`
///
/// The referenced contact must belong to the same organization.
pub async fn create_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Json(body): Json<CreateDeal>,
) -> ApiResult<(StatusCode, Json<Deal>)> {
    let deal = DealService::new(state.store.clone())
        .create_deal(org_id, user.id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

/// `GET /api/v1/deals`
pub async fn list_deals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<Deal>>> {
    let deals = DealService::new(state.store.clone())
        .deals(org_id, user.id, pagination.page())
        .await?;
    Ok(Json(deals))
}

/// `GET /api/v1/deals/:id`
pub async fn get_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Deal>> {
    let deal = DealService::new(state.store.clone())
        .deal(org_id, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(deal))
}

/// `PATCH /api/v1/deals/:id`
///
/// Changing the stage to a different value is logged to the activity
/// trail; the deal's status can only change via close.
pub async fn update_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDeal>,
) -> ApiResult<Json<Deal>> {
    let deal = DealService::new(state.store.clone())
        .update_deal(org_id, user.id, id, body)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(deal))
}

/// `POST /api/v1/deals/:id/close`
///
/// # Errors
///
/// - `400 Bad Request`: deal already closed
pub async fn close_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Deal>> {
    let deal = DealService::new(state.store.clone())
        .close_deal(org_id, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(deal))
}

/// `DELETE /api/v1/deals/:id`
pub async fn delete_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = DealService::new(state.store.clone())
        .delete_deal(org_id, user.id, id)
        .await?;
    if !deleted {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
