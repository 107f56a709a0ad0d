//! Activities: the append-only record of domain events.
//!
//! Activity rows are written by the deal and task services in the same
//! transaction as the mutation they describe, and are never updated or
//! deleted afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of domain event an activity records. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    DealCreated,
    DealStageChanged,
    DealClosed,
    TaskCreated,
    TaskCompleted,
}

impl ActivityType {
    /// Event name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::DealCreated => "deal_created",
            ActivityType::DealStageChanged => "deal_stage_changed",
            ActivityType::DealClosed => "deal_closed",
            ActivityType::TaskCreated => "task_created",
            ActivityType::TaskCompleted => "task_completed",
        }
    }
}

/// One recorded domain event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    /// Activity ID
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// User whose action produced the event
    pub user_id: Uuid,

    /// Related deal, if any
    pub deal_id: Option<Uuid>,

    /// Related contact, if any
    pub contact_id: Option<Uuid>,

    /// Related task, if any
    pub task_id: Option<Uuid>,

    /// Event kind
    pub activity_type: ActivityType,

    /// Human-readable description of what happened
    pub description: String,

    /// When the event was recorded
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Builds an activity describing a deal event.
    pub fn for_deal(
        organization_id: Uuid,
        user_id: Uuid,
        deal_id: Uuid,
        activity_type: ActivityType,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            deal_id: Some(deal_id),
            contact_id: None,
            task_id: None,
            activity_type,
            description,
            created_at: Utc::now(),
        }
    }

    /// Builds an activity describing a task event.
    pub fn for_task(
        organization_id: Uuid,
        user_id: Uuid,
        task_id: Uuid,
        activity_type: ActivityType,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            deal_id: None,
            contact_id: None,
            task_id: Some(task_id),
            activity_type,
            description,
            created_at: Utc::now(),
        }
    }
}
