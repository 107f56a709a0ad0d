//! Tasks: work items within an organization.
//!
//! A task may reference a deal and/or contact (both must belong to the same
//! organization) and may be assigned to a user. Status is `pending` →
//! (complete) → `completed`, terminal; completion stamps `completed_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// A task within an organization.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Task ID
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// Related deal, if any (same organization)
    pub deal_id: Option<Uuid>,

    /// Related contact, if any (same organization)
    pub contact_id: Option<Uuid>,

    /// Assigned user, if any
    pub assigned_to_id: Option<Uuid>,

    /// Task title
    pub title: String,

    /// Longer description
    pub description: Option<String>,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Due date, if any
    pub due_date: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,

    /// When the task was completed, if it has been
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub deal_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update for a task. Absent fields are left unchanged. For
/// `assigned_to_id` and `due_date` an explicit `null` clears the value,
/// so those two distinguish absent (`None`) from null (`Some(None)`).
/// Status is deliberately absent; the only status transition is
/// `complete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to_id: Option<Option<Uuid>>,
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// A field that was present in the payload, even as `null`, deserializes
/// to `Some`; `#[serde(default)]` covers the absent case with `None`.
fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Task {
    /// Builds a new pending task record with a fresh id and timestamps.
    pub fn new(organization_id: Uuid, data: CreateTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            deal_id: data.deal_id,
            contact_id: data.contact_id,
            assigned_to_id: data.assigned_to_id,
            title: data.title,
            description: data.description,
            status: TaskStatus::Pending,
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`.
    pub fn apply(&mut self, changes: UpdateTask) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
        if let Some(assigned_to_id) = changes.assigned_to_id {
            self.assigned_to_id = assigned_to_id;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        self.updated_at = Utc::now();
    }
}
