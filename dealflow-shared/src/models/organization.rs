//! Organizations: the tenant boundary.
//!
//! Every contact, deal, task, and activity belongs to exactly one
//! organization, and all access checks resolve against the caller's
//! membership in that organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant. Owns memberships and all domain entities created under it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Organization ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// When the organization was created
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Builds a new organization record with a fresh id and timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
