//! In-memory implementation of the store traits.
//!
//! Everything lives in one set of maps behind a single async mutex, which
//! gives the same atomicity as the Postgres transactions: a compound
//! operation holds the lock for both writes. Used by unit tests, the API
//! integration tests, and nothing in production.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::activity::Activity;
use crate::models::contact::{Contact, UpdateContact};
use crate::models::deal::{Deal, DealStatus, DealSummary, StageCount, UpdateDeal, FUNNEL_STAGES};
use crate::models::membership::Membership;
use crate::models::organization::Organization;
use crate::models::task::{Task, TaskStatus, UpdateTask};
use crate::models::user::User;

use super::{
    ActivityStore, ContactStore, DealStore, MembershipStore, OrganizationStore, Page, StoreError,
    StoreResult, TaskStore, UserStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<Uuid, Membership>,
    contacts: HashMap<Uuid, Contact>,
    deals: HashMap<Uuid, Deal>,
    tasks: HashMap<Uuid, Task>,
    activities: Vec<Activity>,
}

/// Map-backed store behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(mut rows: Vec<T>, page: Page) -> Vec<T> {
    let skip = page.skip.max(0) as usize;
    let limit = page.limit.max(0) as usize;
    if skip >= rows.len() {
        return Vec::new();
    }
    rows.drain(..skip);
    rows.truncate(limit);
    rows
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email"));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn insert_organization(
        &self,
        organization: Organization,
        owner: Membership,
    ) -> StoreResult<Organization> {
        let mut tables = self.tables.lock().await;
        tables
            .organizations
            .insert(organization.id, organization.clone());
        tables.memberships.insert(owner.id, owner);
        Ok(organization)
    }

    async fn organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.tables.lock().await.organizations.get(&id).cloned())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn insert_membership(&self, membership: Membership) -> StoreResult<Membership> {
        let mut tables = self.tables.lock().await;
        if tables.memberships.values().any(|m| {
            m.organization_id == membership.organization_id && m.user_id == membership.user_id
        }) {
            return Err(StoreError::Conflict("membership"));
        }
        tables.memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .tables
            .lock()
            .await
            .memberships
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn memberships_by_organization(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn memberships_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact> {
        let mut tables = self.tables.lock().await;
        tables.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn contact_by_id(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        Ok(self.tables.lock().await.contacts.get(&id).cloned())
    }

    async fn contacts_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Contact>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Contact> = tables
            .contacts
            .values()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn update_contact(
        &self,
        id: Uuid,
        changes: UpdateContact,
    ) -> StoreResult<Option<Contact>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.contacts.get_mut(&id).map(|contact| {
            contact.apply(changes);
            contact.clone()
        }))
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.lock().await.contacts.remove(&id).is_some())
    }
}

#[async_trait]
impl DealStore for MemoryStore {
    async fn insert_deal(&self, deal: Deal, activity: Activity) -> StoreResult<Deal> {
        let mut tables = self.tables.lock().await;
        tables.deals.insert(deal.id, deal.clone());
        tables.activities.push(activity);
        Ok(deal)
    }

    async fn deal_by_id(&self, id: Uuid) -> StoreResult<Option<Deal>> {
        Ok(self.tables.lock().await.deals.get(&id).cloned())
    }

    async fn deals_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Deal>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Deal> = tables
            .deals
            .values()
            .filter(|d| d.organization_id == organization_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn update_deal(
        &self,
        id: Uuid,
        changes: UpdateDeal,
        activity: Option<Activity>,
    ) -> StoreResult<Option<Deal>> {
        let mut tables = self.tables.lock().await;
        let updated = tables.deals.get_mut(&id).map(|deal| {
            deal.apply(changes);
            deal.clone()
        });
        if updated.is_some() {
            if let Some(activity) = activity {
                tables.activities.push(activity);
            }
        }
        Ok(updated)
    }

    async fn close_deal(
        &self,
        id: Uuid,
        closed_at: DateTime<Utc>,
        activity: Activity,
    ) -> StoreResult<Option<Deal>> {
        let mut tables = self.tables.lock().await;
        let closed = match tables.deals.get_mut(&id) {
            Some(deal) if deal.status == DealStatus::Open => {
                deal.status = DealStatus::Closed;
                deal.closed_at = Some(closed_at);
                deal.updated_at = closed_at;
                Some(deal.clone())
            }
            _ => None,
        };
        if closed.is_some() {
            tables.activities.push(activity);
        }
        Ok(closed)
    }

    async fn delete_deal(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.lock().await.deals.remove(&id).is_some())
    }

    async fn deal_summary(&self, organization_id: Uuid) -> StoreResult<DealSummary> {
        let tables = self.tables.lock().await;
        let values: Vec<f64> = tables
            .deals
            .values()
            .filter(|d| d.organization_id == organization_id && d.status == DealStatus::Closed)
            .map(|d| d.value.unwrap_or(0.0))
            .collect();
        let total = values.len() as i64;
        let total_value: f64 = values.iter().sum();
        let avg_value = if total > 0 {
            total_value / total as f64
        } else {
            0.0
        };
        Ok(DealSummary {
            total,
            total_value,
            avg_value,
        })
    }

    async fn deal_funnel(&self, organization_id: Uuid) -> StoreResult<Vec<StageCount>> {
        let tables = self.tables.lock().await;
        Ok(FUNNEL_STAGES
            .iter()
            .map(|stage| StageCount {
                stage: (*stage).to_string(),
                count: tables
                    .deals
                    .values()
                    .filter(|d| d.organization_id == organization_id && d.stage == *stage)
                    .count() as i64,
            })
            .collect())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: Task, activity: Activity) -> StoreResult<Task> {
        let mut tables = self.tables.lock().await;
        tables.tasks.insert(task.id, task.clone());
        tables.activities.push(activity);
        Ok(task)
    }

    async fn task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tables.lock().await.tasks.get(&id).cloned())
    }

    async fn tasks_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Task>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn update_task(&self, id: Uuid, changes: UpdateTask) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.tasks.get_mut(&id).map(|task| {
            task.apply(changes);
            task.clone()
        }))
    }

    async fn complete_task(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        activity: Activity,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.lock().await;
        let completed = match tables.tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(completed_at);
                task.updated_at = completed_at;
                Some(task.clone())
            }
            _ => None,
        };
        if completed.is_some() {
            tables.activities.push(activity);
        }
        Ok(completed)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.lock().await.tasks.remove(&id).is_some())
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn activities_by_organization(
        &self,
        organization_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Activity>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Activity> = tables
            .activities
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(paginate(rows, page))
    }

    async fn activities_by_deal(
        &self,
        organization_id: Uuid,
        deal_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<Activity>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Activity> = tables
            .activities
            .iter()
            .filter(|a| a.organization_id == organization_id && a.deal_id == Some(deal_id))
            .cloned()
            .collect();
        rows.reverse();
        Ok(paginate(rows, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityType;
    use crate::models::contact::CreateContact;
    use crate::models::deal::CreateDeal;
    use crate::models::membership::Role;
    use crate::models::task::CreateTask;

    fn contact(org: Uuid) -> Contact {
        Contact::new(
            org,
            CreateContact {
                name: "Ada".to_string(),
                ..Default::default()
            },
        )
    }

    fn deal(org: Uuid, value: Option<f64>) -> Deal {
        Deal::new(
            org,
            CreateDeal {
                contact_id: Uuid::new_v4(),
                title: "Renewal".to_string(),
                value,
                stage: None,
                notes: None,
            },
        )
    }

    fn deal_activity(d: &Deal) -> Activity {
        Activity::for_deal(
            d.organization_id,
            Uuid::new_v4(),
            d.id,
            ActivityType::DealCreated,
            format!("deal '{}' created", d.title),
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let a = User::new("dup@example.com".to_string(), "h".to_string(), "A".to_string());
        let b = User::new("dup@example.com".to_string(), "h".to_string(), "B".to_string());

        store.insert_user(a).await.expect("insert");
        assert!(matches!(
            store.insert_user(b).await,
            Err(StoreError::Conflict("email"))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_membership_conflicts() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();

        store
            .insert_membership(Membership::new(org, user, Role::Member))
            .await
            .expect("insert");
        assert!(matches!(
            store
                .insert_membership(Membership::new(org, user, Role::Admin))
                .await,
            Err(StoreError::Conflict("membership"))
        ));
    }

    #[tokio::test]
    async fn test_close_deal_is_conditional() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let d = deal(org, Some(100.0));
        let id = d.id;
        store
            .insert_deal(d.clone(), deal_activity(&d))
            .await
            .expect("insert");

        let close = |at| {
            Activity::for_deal(
                org,
                Uuid::new_v4(),
                id,
                ActivityType::DealClosed,
                format!("deal 'Renewal' closed at {at}"),
            )
        };
        let first = store
            .close_deal(id, Utc::now(), close(1))
            .await
            .expect("close");
        assert!(first.is_some());

        // Second close finds the deal already closed and writes no activity.
        let second = store
            .close_deal(id, Utc::now(), close(2))
            .await
            .expect("close");
        assert!(second.is_none());

        let activities = store
            .activities_by_deal(org, id, Page::default())
            .await
            .expect("activities");
        let closes = activities
            .iter()
            .filter(|a| a.activity_type == ActivityType::DealClosed)
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_complete_task_is_conditional() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let t = Task::new(
            org,
            CreateTask {
                title: "Call back".to_string(),
                description: None,
                deal_id: None,
                contact_id: None,
                assigned_to_id: None,
                due_date: None,
            },
        );
        let id = t.id;
        let created = Activity::for_task(
            org,
            Uuid::new_v4(),
            id,
            ActivityType::TaskCreated,
            "task 'Call back' created".to_string(),
        );
        store.insert_task(t, created).await.expect("insert");

        let completed = Activity::for_task(
            org,
            Uuid::new_v4(),
            id,
            ActivityType::TaskCompleted,
            "task 'Call back' completed".to_string(),
        );
        assert!(store
            .complete_task(id, Utc::now(), completed.clone())
            .await
            .expect("complete")
            .is_some());
        assert!(store
            .complete_task(id, Utc::now(), completed)
            .await
            .expect("complete")
            .is_none());
    }

    #[tokio::test]
    async fn test_summary_over_closed_deals_only() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();

        for value in [Some(100.0), Some(300.0)] {
            let d = deal(org, value);
            let id = d.id;
            store
                .insert_deal(d.clone(), deal_activity(&d))
                .await
                .expect("insert");
            let activity = Activity::for_deal(
                org,
                Uuid::new_v4(),
                id,
                ActivityType::DealClosed,
                "deal 'Renewal' closed".to_string(),
            );
            store
                .close_deal(id, Utc::now(), activity)
                .await
                .expect("close");
        }
        // One open deal that must not count.
        let open = deal(org, Some(999.0));
        store
            .insert_deal(open.clone(), deal_activity(&open))
            .await
            .expect("insert");

        let summary = store.deal_summary(org).await.expect("summary");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.total_value, 400.0);
        assert_eq!(summary.avg_value, 200.0);
    }

    #[tokio::test]
    async fn test_funnel_zero_fills_stages() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let d = deal(org, None);
        store
            .insert_deal(d.clone(), deal_activity(&d))
            .await
            .expect("insert");

        let funnel = store.deal_funnel(org).await.expect("funnel");
        assert_eq!(funnel.len(), FUNNEL_STAGES.len());
        assert_eq!(funnel[0].stage, "new");
        assert_eq!(funnel[0].count, 1);
        assert!(funnel[1..].iter().all(|s| s.count == 0));
    }

    #[tokio::test]
    async fn test_pagination() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        for _ in 0..5 {
            store
                .insert_contact(contact(org))
                .await
                .expect("insert");
        }

        let page = store
            .contacts_by_organization(org, Page { skip: 2, limit: 2 })
            .await
            .expect("list");
        assert_eq!(page.len(), 2);

        let past_end = store
            .contacts_by_organization(org, Page { skip: 10, limit: 2 })
            .await
            .expect("list");
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_lists_are_tenant_scoped() {
        let store = MemoryStore::new();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        store.insert_contact(contact(org_a)).await.expect("insert");
        store.insert_contact(contact(org_b)).await.expect("insert");

        let listed = store
            .contacts_by_organization(org_a, Page::default())
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].organization_id, org_a);
    }
}
