//! Deals: sales opportunities tied to a contact.
//!
//! A deal has two independent axes of state:
//!
//! - `status`: `open` → (close) → `closed`, terminal. Closing stamps
//!   `closed_at` and is the only status transition.
//! - `stage`: a free-form label within the funnel vocabulary
//!   (new/qualification/proposal/negotiation/closed). The stage never gates
//!   status transitions and can be set freely; changing it to a different
//!   value is what produces a `deal_stage_changed` activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The funnel vocabulary, in pipeline order. Used by analytics to report a
/// zero-filled count per stage; stage values themselves are not validated
/// against it.
pub const FUNNEL_STAGES: [&str; 5] = ["new", "qualification", "proposal", "negotiation", "closed"];

/// Stage assigned to new deals when none is given.
pub const DEFAULT_STAGE: &str = "new";

/// Deal lifecycle status, independent of `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "deal_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Open,
    Closed,
}

/// A deal within an organization. Always references a contact in the same
/// organization.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deal {
    /// Deal ID
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// Contact this deal is attached to (same organization)
    pub contact_id: Uuid,

    /// Deal title
    pub title: String,

    /// Monetary value
    pub value: Option<f64>,

    /// Funnel stage label
    pub stage: String,

    /// Lifecycle status
    pub status: DealStatus,

    /// Free-form notes
    pub notes: Option<String>,

    /// When the deal was created
    pub created_at: DateTime<Utc>,

    /// When the deal was last updated
    pub updated_at: DateTime<Utc>,

    /// When the deal was closed, if it has been
    pub closed_at: Option<DateTime<Utc>>,
}

/// Input for creating a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeal {
    pub contact_id: Uuid,
    pub title: String,
    pub value: Option<f64>,
    /// Defaults to [`DEFAULT_STAGE`] when absent.
    pub stage: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for a deal. `None` fields are left unchanged. Status is
/// deliberately absent; the only status transition is `close`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDeal {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub stage: Option<String>,
    pub notes: Option<String>,
}

/// Aggregate over an organization's closed deals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealSummary {
    /// Number of closed deals
    pub total: i64,

    /// Sum of closed deal values
    pub total_value: f64,

    /// Average closed deal value
    pub avg_value: f64,
}

/// Deal count for one funnel stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: String,
    pub count: i64,
}

impl Deal {
    /// Builds a new open deal record with a fresh id and timestamps.
    pub fn new(organization_id: Uuid, data: CreateDeal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            contact_id: data.contact_id,
            title: data.title,
            value: data.value,
            stage: data.stage.unwrap_or_else(|| DEFAULT_STAGE.to_string()),
            status: DealStatus::Open,
            notes: data.notes,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`.
    pub fn apply(&mut self, changes: UpdateDeal) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(value) = changes.value {
            self.value = Some(value);
        }
        if let Some(stage) = changes.stage {
            self.stage = stage;
        }
        if let Some(notes) = changes.notes {
            self.notes = Some(notes);
        }
        self.updated_at = Utc::now();
    }
}
