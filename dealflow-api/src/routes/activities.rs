//! Activity log endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use dealflow_shared::models::activity::Activity;
use dealflow_shared::services::activity::ActivityService;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extract::{CurrentUser, OrgId, Pagination};

/// Query parameters for the activity log. `deal_id` narrows the log to one
/// deal's trail.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub deal_id: Option<Uuid>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /api/v1/activities`: the organization's activity log, newest
/// first, paginated. With `?deal_id=`, only that deal's entries; an id
/// from another organization yields an empty list.
pub async fn list_activities(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let page = Pagination {
        skip: query.skip,
        limit: query.limit,
    }
    .page();
    let service = ActivityService::new(state.store.clone());
    let activities = match query.deal_id {
        Some(deal_id) => {
            service
                .deal_activities(org_id, user.id, deal_id, page)
                .await?
        }
        None => service.activities(org_id, user.id, page).await?,
    };
    Ok(Json(activities))
}
