//! Memberships: the (organization, user, role) relation.
//!
//! A membership row is the sole source of truth for "does this user belong
//! to this organization, and with what privilege". At most one membership
//! exists per (organization, user) pair, enforced by a unique constraint.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE member_role AS ENUM ('owner', 'admin', 'manager', 'member');
//!
//! CREATE TABLE organization_members (
//!     id UUID PRIMARY KEY,
//!     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     role member_role NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     UNIQUE (organization_id, user_id)
//! );
//! ```
//!
//! # Roles
//!
//! Ordered by privilege: `owner` > `admin` > `manager` > `member`. The
//! service layer gates each operation through the capability helpers below
//! rather than comparing role names, so the per-operation rules cannot
//! drift between services. The one gate that is not a pure hierarchy fact
//! (a `member` may update a task assigned to them) lives in the task
//! service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RBAC role within an organization. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control; assigned to the organization creator
    Owner,

    /// Full control except implicit creator status
    Admin,

    /// Can update and close/complete records, and delete tasks
    Manager,

    /// Can create and read records, and update own tasks
    Member,
}

impl Role {
    /// Parses a role from its wire name. `None` for anything outside the
    /// closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "member" => Some(Role::Member),
            _ => None,
        }
    }

    /// Role name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    /// Numeric privilege rank: owner=4, admin=3, manager=2, member=1.
    fn rank(&self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Member => 1,
        }
    }

    /// True if this role ranks at least as high as `required`.
    pub fn at_least(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Can update contacts and deals, and close deals. Everyone but `member`.
    pub fn can_update_records(&self) -> bool {
        !matches!(self, Role::Member)
    }

    /// Can delete contacts and deals. Owners and admins only.
    pub fn can_delete_records(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Can delete tasks. Everyone but `member`.
    pub fn can_delete_tasks(&self) -> bool {
        !matches!(self, Role::Member)
    }

    /// Can add members to the organization. Owners and admins only.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// A user's membership in an organization.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Membership ID
    pub id: Uuid,

    /// Organization
    pub organization_id: Uuid,

    /// Member user
    pub user_id: Uuid,

    /// Role within the organization
    pub role: Role,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Builds a new membership record with a fresh id and timestamp.
    pub fn new(organization_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}
