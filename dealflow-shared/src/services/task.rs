//! Task operations: CRUD, assignment, and the complete transition.
//!
//! Task gates differ from contacts and deals in two places. A `member`
//! may update a task if it is assigned to them, which can only be decided
//! after the task is fetched. And completing a task carries no role gate
//! at all; any member may complete any task in their organization.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::activity::{Activity, ActivityType};
use crate::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use crate::store::{Page, Store};

use super::{require_membership, ServiceError, ServiceResult};

pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a pending task, logging a `task_created` activity. Any
    /// referenced deal or contact must belong to the same organization,
    /// and any assignee must be a member of it.
    pub async fn create_task(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        data: CreateTask,
    ) -> ServiceResult<Task> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if data.title.trim().is_empty() {
            return Err(ServiceError::Validation("task title is required".into()));
        }
        if let Some(deal_id) = data.deal_id {
            let deal_ok = self
                .store
                .deal_by_id(deal_id)
                .await?
                .is_some_and(|d| d.organization_id == organization_id);
            if !deal_ok {
                return Err(ServiceError::Validation(
                    "deal not found in this organization".into(),
                ));
            }
        }
        if let Some(contact_id) = data.contact_id {
            let contact_ok = self
                .store
                .contact_by_id(contact_id)
                .await?
                .is_some_and(|c| c.organization_id == organization_id);
            if !contact_ok {
                return Err(ServiceError::Validation(
                    "contact not found in this organization".into(),
                ));
            }
        }
        if let Some(assignee) = data.assigned_to_id {
            if self
                .store
                .membership(organization_id, assignee)
                .await?
                .is_none()
            {
                return Err(ServiceError::Validation(
                    "assignee is not a member of this organization".into(),
                ));
            }
        }

        let task = Task::new(organization_id, data);
        let activity = Activity::for_task(
            organization_id,
            user_id,
            task.id,
            ActivityType::TaskCreated,
            format!("task '{}' created", task.title),
        );
        Ok(self.store.insert_task(task, activity).await?)
    }

    /// `Ok(None)` both when the task does not exist and when it belongs to
    /// another organization.
    pub async fn task(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
    ) -> ServiceResult<Option<Task>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .task_by_id(task_id)
            .await?
            .filter(|t| t.organization_id == organization_id))
    }

    pub async fn tasks(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        page: Page,
    ) -> ServiceResult<Vec<Task>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .tasks_by_organization(organization_id, page)
            .await?)
    }

    /// Applies a partial update. A `member` may only update a task
    /// assigned to them; every higher role may update any task.
    pub async fn update_task(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
        changes: UpdateTask,
    ) -> ServiceResult<Option<Task>> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        let Some(existing) = self.store.task_by_id(task_id).await? else {
            return Ok(None);
        };
        if existing.organization_id != organization_id {
            return Ok(None);
        }
        // The assignee exception needs the fetched row, so this gate runs
        // after the fetch rather than before it.
        if !membership.role.can_update_records() && existing.assigned_to_id != Some(user_id) {
            return Err(ServiceError::InsufficientPermission);
        }
        // Clearing the assignee needs no check; a new assignee must be a
        // member.
        if let Some(Some(assignee)) = changes.assigned_to_id {
            if self
                .store
                .membership(organization_id, assignee)
                .await?
                .is_none()
            {
                return Err(ServiceError::Validation(
                    "assignee is not a member of this organization".into(),
                ));
            }
        }
        Ok(self.store.update_task(task_id, changes).await?)
    }

    /// Completes a pending task, stamping `completed_at` and logging a
    /// `task_completed` activity. Any member may complete any task;
    /// completion is terminal.
    pub async fn complete_task(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
    ) -> ServiceResult<Option<Task>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        let Some(existing) = self.store.task_by_id(task_id).await? else {
            return Ok(None);
        };
        if existing.organization_id != organization_id {
            return Ok(None);
        }
        if existing.status == TaskStatus::Completed {
            return Err(ServiceError::AlreadyCompleted);
        }

        let activity = Activity::for_task(
            organization_id,
            user_id,
            task_id,
            ActivityType::TaskCompleted,
            format!("task '{}' completed", existing.title),
        );
        match self
            .store
            .complete_task(task_id, Utc::now(), activity)
            .await?
        {
            Some(task) => Ok(Some(task)),
            // The fetch saw it pending but another caller completed it first.
            None => Err(ServiceError::AlreadyCompleted),
        }
    }

    /// Deletes a task. Requires a role above `member`.
    pub async fn delete_task(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
    ) -> ServiceResult<bool> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if !membership.role.can_delete_tasks() {
            return Err(ServiceError::InsufficientPermission);
        }
        let Some(existing) = self.store.task_by_id(task_id).await? else {
            return Ok(false);
        };
        if existing.organization_id != organization_id {
            return Ok(false);
        }
        Ok(self.store.delete_task(task_id).await?)
    }
}
