//! Deal operations: CRUD, stage moves, and the close transition.
//!
//! Every mutation that the activity log records goes through this service,
//! which builds the activity row and hands it to the store so the pair
//! commits atomically. Stage moves only log when the stage actually
//! changes value.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::activity::{Activity, ActivityType};
use crate::models::deal::{CreateDeal, Deal, DealStatus, UpdateDeal};
use crate::store::{Page, Store};

use super::{require_membership, ServiceError, ServiceResult};

pub struct DealService {
    store: Arc<dyn Store>,
}

impl DealService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an open deal attached to a contact in the same
    /// organization, logging a `deal_created` activity.
    pub async fn create_deal(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        data: CreateDeal,
    ) -> ServiceResult<Deal> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if data.title.trim().is_empty() {
            return Err(ServiceError::Validation("deal title is required".into()));
        }
        let contact_ok = self
            .store
            .contact_by_id(data.contact_id)
            .await?
            .is_some_and(|c| c.organization_id == organization_id);
        if !contact_ok {
            return Err(ServiceError::Validation(
                "contact not found in this organization".into(),
            ));
        }

        let deal = Deal::new(organization_id, data);
        let activity = Activity::for_deal(
            organization_id,
            user_id,
            deal.id,
            ActivityType::DealCreated,
            format!("deal '{}' created", deal.title),
        );
        Ok(self.store.insert_deal(deal, activity).await?)
    }

    /// `Ok(None)` both when the deal does not exist and when it belongs to
    /// another organization.
    pub async fn deal(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        deal_id: Uuid,
    ) -> ServiceResult<Option<Deal>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .deal_by_id(deal_id)
            .await?
            .filter(|d| d.organization_id == organization_id))
    }

    pub async fn deals(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        page: Page,
    ) -> ServiceResult<Vec<Deal>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .deals_by_organization(organization_id, page)
            .await?)
    }

    /// Applies a partial update. Moving the deal to a different stage logs
    /// a `deal_stage_changed` activity; setting the same stage again logs
    /// nothing.
    pub async fn update_deal(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        deal_id: Uuid,
        changes: UpdateDeal,
    ) -> ServiceResult<Option<Deal>> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if !membership.role.can_update_records() {
            return Err(ServiceError::InsufficientPermission);
        }
        let Some(existing) = self.store.deal_by_id(deal_id).await? else {
            return Ok(None);
        };
        if existing.organization_id != organization_id {
            return Ok(None);
        }

        let activity = changes
            .stage
            .as_deref()
            .filter(|new_stage| *new_stage != existing.stage)
            .map(|new_stage| {
                Activity::for_deal(
                    organization_id,
                    user_id,
                    deal_id,
                    ActivityType::DealStageChanged,
                    format!("deal stage changed from {} to {}", existing.stage, new_stage),
                )
            });
        Ok(self.store.update_deal(deal_id, changes, activity).await?)
    }

    /// Closes an open deal, stamping `closed_at` and logging a
    /// `deal_closed` activity. Closing is terminal; a second close (or a
    /// lost race against a concurrent one) is `AlreadyClosed`.
    pub async fn close_deal(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        deal_id: Uuid,
    ) -> ServiceResult<Option<Deal>> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if !membership.role.can_update_records() {
            return Err(ServiceError::InsufficientPermission);
        }
        let Some(existing) = self.store.deal_by_id(deal_id).await? else {
            return Ok(None);
        };
        if existing.organization_id != organization_id {
            return Ok(None);
        }
        if existing.status == DealStatus::Closed {
            return Err(ServiceError::AlreadyClosed);
        }

        let activity = Activity::for_deal(
            organization_id,
            user_id,
            deal_id,
            ActivityType::DealClosed,
            format!("deal '{}' closed", existing.title),
        );
        match self.store.close_deal(deal_id, Utc::now(), activity).await? {
            Some(deal) => Ok(Some(deal)),
            // The fetch saw it open but another caller closed it first.
            None => Err(ServiceError::AlreadyClosed),
        }
    }

    pub async fn delete_deal(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        deal_id: Uuid,
    ) -> ServiceResult<bool> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if !membership.role.can_delete_records() {
            return Err(ServiceError::InsufficientPermission);
        }
        let Some(existing) = self.store.deal_by_id(deal_id).await? else {
            return Ok(false);
        };
        if existing.organization_id != organization_id {
            return Ok(false);
        }
        Ok(self.store.delete_deal(deal_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contact::{Contact, CreateContact};
    use crate::services::testutil::{fixture, Fixture};
    use crate::store::ActivityStore;

    async fn seed_contact(fx: &Fixture) -> Uuid {
        let contact = Contact::new(
            fx.org,
            CreateContact {
                name: "Ada".to_string(),
                ..Default::default()
            },
        );
        let id = contact.id;
        fx.store.insert_contact(contact).await.expect("contact");
        id
    }

    fn create(contact_id: Uuid, title: &str) -> CreateDeal {
        CreateDeal {
            contact_id,
            title: title.to_string(),
            value: Some(1_000.0),
            stage: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_logs_activity() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());
        let contact_id = seed_contact(&fx).await;

        let deal = service
            .create_deal(fx.org, fx.member, create(contact_id, "Pilot"))
            .await
            .expect("create");

        let activities = fx
            .store
            .activities_by_deal(fx.org, deal.id, Page::default())
            .await
            .expect("activities");
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, ActivityType::DealCreated);
        assert_eq!(activities[0].description, "deal 'Pilot' created");
        assert_eq!(activities[0].user_id, fx.member);
    }

    #[tokio::test]
    async fn test_create_requires_local_contact() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());

        assert!(matches!(
            service
                .create_deal(fx.org, fx.member, create(Uuid::new_v4(), "Pilot"))
                .await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_stage_change_logs_only_on_real_change() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());
        let contact_id = seed_contact(&fx).await;
        let deal = service
            .create_deal(fx.org, fx.owner, create(contact_id, "Pilot"))
            .await
            .expect("create");

        // Same stage again: no activity.
        service
            .update_deal(
                fx.org,
                fx.manager,
                deal.id,
                UpdateDeal {
                    stage: Some("new".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        // Different stage: one activity with the old and new labels.
        service
            .update_deal(
                fx.org,
                fx.manager,
                deal.id,
                UpdateDeal {
                    stage: Some("proposal".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        let activities = fx
            .store
            .activities_by_deal(fx.org, deal.id, Page::default())
            .await
            .expect("activities");
        let stage_changes: Vec<_> = activities
            .iter()
            .filter(|a| a.activity_type == ActivityType::DealStageChanged)
            .collect();
        assert_eq!(stage_changes.len(), 1);
        assert_eq!(
            stage_changes[0].description,
            "deal stage changed from new to proposal"
        );
    }

    #[tokio::test]
    async fn test_member_cannot_update_or_close() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());
        let contact_id = seed_contact(&fx).await;
        let deal = service
            .create_deal(fx.org, fx.member, create(contact_id, "Pilot"))
            .await
            .expect("create");

        assert!(matches!(
            service
                .update_deal(fx.org, fx.member, deal.id, UpdateDeal::default())
                .await,
            Err(ServiceError::InsufficientPermission)
        ));
        assert!(matches!(
            service.close_deal(fx.org, fx.member, deal.id).await,
            Err(ServiceError::InsufficientPermission)
        ));
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());
        let contact_id = seed_contact(&fx).await;
        let deal = service
            .create_deal(fx.org, fx.owner, create(contact_id, "Pilot"))
            .await
            .expect("create");

        let closed = service
            .close_deal(fx.org, fx.manager, deal.id)
            .await
            .expect("close")
            .expect("deal");
        assert_eq!(closed.status, DealStatus::Closed);
        assert!(closed.closed_at.is_some());

        assert!(matches!(
            service.close_deal(fx.org, fx.manager, deal.id).await,
            Err(ServiceError::AlreadyClosed)
        ));

        let activities = fx
            .store
            .activities_by_deal(fx.org, deal.id, Page::default())
            .await
            .expect("activities");
        assert_eq!(activities[0].activity_type, ActivityType::DealClosed);
        assert_eq!(activities[0].description, "deal 'Pilot' closed");
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());
        let contact_id = seed_contact(&fx).await;
        let deal = service
            .create_deal(fx.org, fx.owner, create(contact_id, "Pilot"))
            .await
            .expect("create");

        assert!(matches!(
            service.delete_deal(fx.org, fx.manager, deal.id).await,
            Err(ServiceError::InsufficientPermission)
        ));
        assert!(service
            .delete_deal(fx.org, fx.admin, deal.id)
            .await
            .expect("delete"));
    }

    #[tokio::test]
    async fn test_cross_tenant_deal_looks_missing() {
        let fx = fixture().await;
        let service = DealService::new(fx.store.clone());
        let contact_id = seed_contact(&fx).await;
        let deal = service
            .create_deal(fx.org, fx.owner, create(contact_id, "Pilot"))
            .await
            .expect("create");

        let other_org = {
            let org = crate::models::organization::Organization::new("Other".to_string());
            let owner = crate::models::membership::Membership::new(
                org.id,
                fx.outsider,
                crate::models::membership::Role::Owner,
            );
            fx.store
                .insert_organization(org.clone(), owner)
                .await
                .expect("org");
            org.id
        };

        // The deal id is real but unreachable from the other organization.
        assert!(service
            .deal(other_org, fx.outsider, deal.id)
            .await
            .expect("get")
            .is_none());
        assert!(service
            .close_deal(other_org, fx.outsider, deal.id)
            .await
            .expect("close")
            .is_none());
    }
}
