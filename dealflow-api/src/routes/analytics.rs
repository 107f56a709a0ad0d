//! Deal analytics endpoints.
//!
//! Results are served from a short-TTL per-tenant cache; the membership
//! check always runs, cached or not.

use axum::{extract::State, Json};
use dealflow_shared::models::deal::{DealSummary, StageCount};
use dealflow_shared::services::analytics::AnalyticsService;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::extract::{CurrentUser, OrgId};

/// `GET /api/v1/analytics/deals/summary`: count, total, and average value
/// over the organization's closed deals.
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
) -> ApiResult<Json<DealSummary>> {
    let summary = AnalyticsService::new(state.store.clone(), state.analytics.clone())
        .summary(org_id, user.id)
        .await?;
    Ok(Json(summary))
}

/// `GET /api/v1/analytics/deals/funnel`: deal count per funnel stage.
pub async fn funnel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
) -> ApiResult<Json<Vec<StageCount>>> {
    let funnel = AnalyticsService::new(state.store.clone(), state.analytics.clone())
        .funnel(org_id, user.id)
        .await?;
    Ok(Json(funnel))
}
