//! Persistence layer: repository traits and their implementations.
//!
//! Services talk to storage exclusively through the per-entity traits
//! below, combined in the [`Store`] facade. Two implementations exist:
//!
//! - [`PgStore`]: sqlx/Postgres, the production backend. Compound
//!   operations run in a single database transaction.
//! - [`MemoryStore`]: in-process maps behind one lock, for unit tests,
//!   integration tests, and local experiments.
//!
//! # Atomicity contract
//!
//! Operations that pair a mutation with an activity append
//! ([`DealStore::insert_deal`], [`DealStore::close_deal`],
//! [`TaskStore::insert_task`], [`TaskStore::complete_task`],
//! [`DealStore::update_deal`] when a stage-change activity is supplied, and
//! [`OrganizationStore::insert_organization`] with its owner membership)
//! must commit both writes or neither; callers never observe a mutation
//! without its activity record.
//!
//! # Terminal transitions under concurrency
//!
//! [`DealStore::close_deal`] and [`TaskStore::complete_task`] are
//! conditional on the row still being in its non-terminal state. Of two
//! concurrent callers exactly one receives the updated row; the other gets
//! `None` and the service reports the terminal-state error. The activity is
//! only written for the winner.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::activity::Activity;
use crate::models::contact::{Contact, UpdateContact};
use crate::models::deal::{Deal, DealSummary, StageCount, UpdateDeal};
use crate::models::membership::Membership;
use crate::models::organization::Organization;
use crate::models::task::{Task, UpdateTask};
use crate::models::user::User;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated
    #[error("duplicate {0}")]
    Conflict(&'static str),

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type alias.
pub type StoreResult<T> = Result<T, StoreError>;

/// Offset/limit pagination for list reads.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// Rows to skip
    pub skip: i64,

    /// Maximum rows to return
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

/// User rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. `Conflict` if the email is already taken.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Exact match on the stored email value.
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Organization rows.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Inserts an organization together with its owner membership,
    /// atomically.
    async fn insert_organization(
        &self,
        organization: Organization,
        owner: Membership,
    ) -> StoreResult<Organization>;

    async fn organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>>;
}

/// Membership rows: the source of truth for tenant access.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Inserts a membership. `Conflict` if the (organization, user) pair
    /// already has one.
    async fn insert_membership(&self, membership: Membership) -> StoreResult<Membership>;

    /// The single lookup every gated operation depends on.
    async fn membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>>;

    async fn memberships_by_organization(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Vec<Membership>>;

    async fn memberships_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Membership>>;
}

/// Contact rows.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact>;

    async fn contact_by_id(&self, id: Uuid) -> StoreResult<Option<Contact>>;

    async fn contacts_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Contact>>;

    /// Applies a partial update. `None` if the row does not exist.
    async fn update_contact(&self, id: Uuid, changes: UpdateContact)
        -> StoreResult<Option<Contact>>;

    /// `false` if the row does not exist.
    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool>;
}

/// Deal rows plus the aggregates analytics reads.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Inserts a deal and its `deal_created` activity atomically.
    async fn insert_deal(&self, deal: Deal, activity: Activity) -> StoreResult<Deal>;

    async fn deal_by_id(&self, id: Uuid) -> StoreResult<Option<Deal>>;

    async fn deals_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Deal>>;

    /// Applies a partial update, appending the stage-change activity (when
    /// supplied) in the same transaction. `None` if the row does not exist.
    async fn update_deal(
        &self,
        id: Uuid,
        changes: UpdateDeal,
        activity: Option<Activity>,
    ) -> StoreResult<Option<Deal>>;

    /// Closes a deal if it is still open, stamping `closed_at` and
    /// appending the activity atomically. `None` when the row is missing
    /// or already closed; the caller decides which of those it was.
    async fn close_deal(
        &self,
        id: Uuid,
        closed_at: DateTime<Utc>,
        activity: Activity,
    ) -> StoreResult<Option<Deal>>;

    /// `false` if the row does not exist.
    async fn delete_deal(&self, id: Uuid) -> StoreResult<bool>;

    /// Count / total / average value over the organization's closed deals.
    async fn deal_summary(&self, organization_id: Uuid) -> StoreResult<DealSummary>;

    /// Deal count per funnel stage, zero-filled over the funnel vocabulary.
    async fn deal_funnel(&self, organization_id: Uuid) -> StoreResult<Vec<StageCount>>;
}

/// Task rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task and its `task_created` activity atomically.
    async fn insert_task(&self, task: Task, activity: Activity) -> StoreResult<Task>;

    async fn task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn tasks_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Task>>;

    /// Applies a partial update. `None` if the row does not exist.
    async fn update_task(&self, id: Uuid, changes: UpdateTask) -> StoreResult<Option<Task>>;

    /// Completes a task if it is still pending, stamping `completed_at` and
    /// appending the activity atomically. `None` when the row is missing or
    /// already completed.
    async fn complete_task(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        activity: Activity,
    ) -> StoreResult<Option<Task>>;

    /// `false` if the row does not exist.
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
}

/// Activity rows. Append-only: writes happen inside the deal/task compound
/// operations, so this trait only reads.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Newest first.
    async fn activities_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Activity>>;

    /// Newest first, restricted to one deal.
    async fn activities_by_deal(
        &self,
        organization_id: Uuid,
        deal_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Activity>>;
}

/// The full persistence facade services are handed.
pub trait Store:
    UserStore
    + OrganizationStore
    + MembershipStore
    + ContactStore
    + DealStore
    + TaskStore
    + ActivityStore
{
}

impl<T> Store for T where
    T: UserStore
        + OrganizationStore
        + MembershipStore
        + ContactStore
        + DealStore
        + TaskStore
        + ActivityStore
{
}
