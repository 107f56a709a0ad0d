//! Task endpoints.
//!
//! # Endpoints
//!
//! - `POST   /api/v1/tasks` - Create task (any member)
//! - `GET    /api/v1/tasks` - List tasks, paginated
//! - `GET    /api/v1/tasks/:id` - Fetch one task
//! - `PATCH  /api/v1/tasks/:id` - Update (manager and above, or the assignee)
//! - `POST   /api/v1/tasks/:id/complete` - Complete (any member, terminal)
//! - `DELETE /api/v1/tasks/:id` - Delete (manager and above)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dealflow_shared::models::task::{CreateTask, Task, UpdateTask};
use dealflow_shared::services::task::TaskService;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentUser, OrgId, Pagination};

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// `POST /api/v1/tasks`
///
/// Referenced deal/contact must belong to the same organization, and any
/// assignee must be a member of it.
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Json(body): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = TaskService::new(state.store.clone())
        .create_task(org_id, user.id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /api/v1/tasks`
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = TaskService::new(state.store.clone())
        .tasks(org_id, user.id, pagination.page())
        .await?;
    Ok(Json(tasks))
}

/// `GET /api/v1/tasks/:id`
pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = TaskService::new(state.store.clone())
        .task(org_id, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

/// `PATCH /api/v1/tasks/:id`
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    let task = TaskService::new(state.store.clone())
        .update_task(org_id, user.id, id, body)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

/// `POST /api/v1/tasks/:id/complete`
///
/// # Errors
///
/// - `400 Bad Request`: task already completed
pub async fn complete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = TaskService::new(state.store.clone())
        .complete_task(org_id, user.id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

/// `DELETE /api/v1/tasks/:id`
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OrgId(org_id): OrgId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let deleted = TaskService::new(state.store.clone())
        .delete_task(org_id, user.id, id)
        .await?;
    if !deleted {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
