//! sqlx/Postgres implementation of the store traits.
//!
//! Rows are generated in Rust (ids, timestamps) and inserted verbatim, so
//! a record returned from an insert is the record a subsequent read sees.
//! Compound operations (mutation plus activity, organization plus owner
//! membership) run inside one transaction. Terminal transitions are
//! conditional updates keyed on the current status, so concurrent callers
//! race on the database row rather than on a read-check-write window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::activity::Activity;
use crate::models::contact::{Contact, UpdateContact};
use crate::models::deal::{Deal, DealSummary, StageCount, UpdateDeal, FUNNEL_STAGES};
use crate::models::membership::Membership;
use crate::models::organization::Organization;
use crate::models::task::{Task, UpdateTask};
use crate::models::user::User;

use super::{
    ActivityStore, ContactStore, DealStore, MembershipStore, OrganizationStore, Page, StoreError,
    StoreResult, TaskStore, UserStore,
};

/// Postgres-backed store. Cheap to clone; wraps a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint violation to `Conflict(what)`, passing other
/// database errors through.
fn conflict(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(err),
    }
}

async fn insert_activity(conn: &mut PgConnection, activity: &Activity) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO activities
            (id, organization_id, user_id, deal_id, contact_id, task_id,
             activity_type, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(activity.id)
    .bind(activity.organization_id)
    .bind(activity.user_id)
    .bind(activity.deal_id)
    .bind(activity.contact_id)
    .bind(activity.task_id)
    .bind(activity.activity_type)
    .bind(&activity.description)
    .bind(activity.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, "email"))?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl OrganizationStore for PgStore {
    async fn insert_organization(
        &self,
        organization: Organization,
        owner: Membership,
    ) -> StoreResult<Organization> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO organizations (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(organization.id)
            .bind(&organization.name)
            .bind(organization.created_at)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO organization_members (id, organization_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(owner.id)
        .bind(owner.organization_id)
        .bind(owner.user_id)
        .bind(owner.role)
        .bind(owner.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(organization)
    }

    async fn organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn insert_membership(&self, membership: Membership) -> StoreResult<Membership> {
        sqlx::query(
            r#"
            INSERT INTO organization_members (id, organization_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(membership.id)
        .bind(membership.organization_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, "membership"))?;
        Ok(membership)
    }

    async fn membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn memberships_by_organization(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Vec<Membership>> {
        let memberships = sqlx::query_as::<_, Membership>(
            "SELECT * FROM organization_members WHERE organization_id = $1 ORDER BY created_at",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(memberships)
    }

    async fn memberships_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Membership>> {
        let memberships = sqlx::query_as::<_, Membership>(
            "SELECT * FROM organization_members WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(memberships)
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact> {
        sqlx::query(
            r#"
            INSERT INTO contacts
                (id, organization_id, name, email, phone, company, notes,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(contact.id)
        .bind(contact.organization_id)
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.company)
        .bind(&contact.notes)
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn contact_by_id(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn contacts_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Contact>> {
        let contacts = sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE organization_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(organization_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn update_contact(
        &self,
        id: Uuid,
        changes: UpdateContact,
    ) -> StoreResult<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                company = COALESCE($5, company),
                notes = COALESCE($6, notes),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.phone)
        .bind(changes.company)
        .bind(changes.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DealStore for PgStore {
    async fn insert_deal(&self, deal: Deal, activity: Activity) -> StoreResult<Deal> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO deals
                (id, organization_id, contact_id, title, value, stage, status,
                 notes, created_at, updated_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(deal.id)
        .bind(deal.organization_id)
        .bind(deal.contact_id)
        .bind(&deal.title)
        .bind(deal.value)
        .bind(&deal.stage)
        .bind(deal.status)
        .bind(&deal.notes)
        .bind(deal.created_at)
        .bind(deal.updated_at)
        .bind(deal.closed_at)
        .execute(&mut *tx)
        .await?;
        insert_activity(&mut tx, &activity).await?;
        tx.commit().await?;
        Ok(deal)
    }

    async fn deal_by_id(&self, id: Uuid) -> StoreResult<Option<Deal>> {
        let deal = sqlx::query_as::<_, Deal>("SELECT * FROM deals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deal)
    }

    async fn deals_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Deal>> {
        let deals = sqlx::query_as::<_, Deal>(
            r#"
            SELECT * FROM deals
            WHERE organization_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(organization_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(deals)
    }

    async fn update_deal(
        &self,
        id: Uuid,
        changes: UpdateDeal,
        activity: Option<Activity>,
    ) -> StoreResult<Option<Deal>> {
        let mut tx = self.pool.begin().await?;
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            UPDATE deals SET
                title = COALESCE($2, title),
                value = COALESCE($3, value),
                stage = COALESCE($4, stage),
                notes = COALESCE($5, notes),
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.value)
        .bind(changes.stage)
        .bind(changes.notes)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;
        if deal.is_some() {
            if let Some(activity) = &activity {
                insert_activity(&mut tx, activity).await?;
            }
        }
        tx.commit().await?;
        Ok(deal)
    }

    async fn close_deal(
        &self,
        id: Uuid,
        closed_at: DateTime<Utc>,
        activity: Activity,
    ) -> StoreResult<Option<Deal>> {
        let mut tx = self.pool.begin().await?;
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            UPDATE deals
            SET status = 'closed', closed_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(closed_at)
        .fetch_optional(&mut *tx)
        .await?;
        if deal.is_some() {
            insert_activity(&mut tx, &activity).await?;
        }
        tx.commit().await?;
        Ok(deal)
    }

    async fn delete_deal(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deal_summary(&self, organization_id: Uuid) -> StoreResult<DealSummary> {
        let (total, total_value, avg_value): (i64, f64, f64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(value), 0)::double precision,
                   COALESCE(AVG(value), 0)::double precision
            FROM deals
            WHERE organization_id = $1 AND status = 'closed'
            "#,
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(DealSummary {
            total,
            total_value,
            avg_value,
        })
    }

    async fn deal_funnel(&self, organization_id: Uuid) -> StoreResult<Vec<StageCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT stage, COUNT(*)
            FROM deals
            WHERE organization_id = $1
            GROUP BY stage
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        let counts: std::collections::HashMap<String, i64> = rows.into_iter().collect();
        Ok(FUNNEL_STAGES
            .iter()
            .map(|stage| StageCount {
                stage: (*stage).to_string(),
                count: counts.get(*stage).copied().unwrap_or(0),
            })
            .collect())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: Task, activity: Activity) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, organization_id, deal_id, contact_id, assigned_to_id, title,
                 description, status, due_date, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(task.id)
        .bind(task.organization_id)
        .bind(task.deal_id)
        .bind(task.contact_id)
        .bind(task.assigned_to_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .execute(&mut *tx)
        .await?;
        insert_activity(&mut tx, &activity).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn tasks_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE organization_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(organization_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, changes: UpdateTask) -> StoreResult<Option<Task>> {
        // assigned_to_id and due_date are clearable, so COALESCE cannot
        // express them; a presence flag drives each CASE instead.
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                assigned_to_id = CASE WHEN $4 THEN $5 ELSE assigned_to_id END,
                due_date = CASE WHEN $6 THEN $7 ELSE due_date END,
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.assigned_to_id.is_some())
        .bind(changes.assigned_to_id.flatten())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn complete_task(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        activity: Activity,
    ) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'completed', completed_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(completed_at)
        .fetch_optional(&mut *tx)
        .await?;
        if task.is_some() {
            insert_activity(&mut tx, &activity).await?;
        }
        tx.commit().await?;
        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ActivityStore for PgStore {
    async fn activities_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT * FROM activities
            WHERE organization_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(organization_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    async fn activities_by_deal(
        &self,
        organization_id: Uuid,
        deal_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT * FROM activities
            WHERE organization_id = $1 AND deal_id = $2
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(organization_id)
        .bind(deal_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }
}
