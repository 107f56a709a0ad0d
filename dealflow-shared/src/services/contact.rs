//! Contact CRUD with per-operation role gates.
//!
//! Any member may create and read contacts. Updates require a role above
//! `member`; deletes require owner or admin.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::contact::{Contact, CreateContact, UpdateContact};
use crate::store::{Page, Store};

use super::{require_membership, ServiceError, ServiceResult};

pub struct ContactService {
    store: Arc<dyn Store>,
}

impl ContactService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_contact(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        data: CreateContact,
    ) -> ServiceResult<Contact> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if data.name.trim().is_empty() {
            return Err(ServiceError::Validation("contact name is required".into()));
        }
        Ok(self
            .store
            .insert_contact(Contact::new(organization_id, data))
            .await?)
    }

    /// `Ok(None)` both when the contact does not exist and when it belongs
    /// to another organization.
    pub async fn contact(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        contact_id: Uuid,
    ) -> ServiceResult<Option<Contact>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .contact_by_id(contact_id)
            .await?
            .filter(|c| c.organization_id == organization_id))
    }

    pub async fn contacts(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        page: Page,
    ) -> ServiceResult<Vec<Contact>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .contacts_by_organization(organization_id, page)
            .await?)
    }

    pub async fn update_contact(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        contact_id: Uuid,
        changes: UpdateContact,
    ) -> ServiceResult<Option<Contact>> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if !membership.role.can_update_records() {
            return Err(ServiceError::InsufficientPermission);
        }
        let Some(existing) = self.store.contact_by_id(contact_id).await? else {
            return Ok(None);
        };
        if existing.organization_id != organization_id {
            return Ok(None);
        }
        Ok(self.store.update_contact(contact_id, changes).await?)
    }

    pub async fn delete_contact(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        contact_id: Uuid,
    ) -> ServiceResult<bool> {
        let membership =
            require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if !membership.role.can_delete_records() {
            return Err(ServiceError::InsufficientPermission);
        }
        let Some(existing) = self.store.contact_by_id(contact_id).await? else {
            return Ok(false);
        };
        if existing.organization_id != organization_id {
            return Ok(false);
        }
        Ok(self.store.delete_contact(contact_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::fixture;

    fn create(name: &str) -> CreateContact {
        CreateContact {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_any_member_creates_and_reads() {
        let fx = fixture().await;
        let service = ContactService::new(fx.store.clone());

        let contact = service
            .create_contact(fx.org, fx.member, create("Ada"))
            .await
            .expect("create");
        let fetched = service
            .contact(fx.org, fx.member, contact.id)
            .await
            .expect("get");
        assert_eq!(fetched.expect("contact").id, contact.id);
    }

    #[tokio::test]
    async fn test_non_member_denied() {
        let fx = fixture().await;
        let service = ContactService::new(fx.store.clone());

        assert!(matches!(
            service.create_contact(fx.org, fx.outsider, create("Ada")).await,
            Err(ServiceError::AccessDenied)
        ));
        assert!(matches!(
            service.contacts(fx.org, fx.outsider, Page::default()).await,
            Err(ServiceError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_member_cannot_update_or_delete() {
        let fx = fixture().await;
        let service = ContactService::new(fx.store.clone());
        let contact = service
            .create_contact(fx.org, fx.member, create("Ada"))
            .await
            .expect("create");

        assert!(matches!(
            service
                .update_contact(fx.org, fx.member, contact.id, UpdateContact::default())
                .await,
            Err(ServiceError::InsufficientPermission)
        ));
        assert!(matches!(
            service.delete_contact(fx.org, fx.member, contact.id).await,
            Err(ServiceError::InsufficientPermission)
        ));
        // Manager may update but not delete.
        assert!(service
            .update_contact(
                fx.org,
                fx.manager,
                contact.id,
                UpdateContact {
                    company: Some("Analytical Engines".to_string()),
                    ..Default::default()
                }
            )
            .await
            .expect("update")
            .is_some());
        assert!(matches!(
            service.delete_contact(fx.org, fx.manager, contact.id).await,
            Err(ServiceError::InsufficientPermission)
        ));
        assert!(service
            .delete_contact(fx.org, fx.admin, contact.id)
            .await
            .expect("delete"));
    }

    #[tokio::test]
    async fn test_cross_tenant_contact_looks_missing() {
        let fx = fixture().await;
        let service = ContactService::new(fx.store.clone());
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
        let foreign = service
            .create_contact(other_org, fx.outsider, create("Elsewhere"))
            .await
            .expect("create");

        // The id is real but unreachable from fx.org.
        assert!(service
            .contact(fx.org, fx.owner, foreign.id)
            .await
            .expect("get")
            .is_none());
        assert!(service
            .update_contact(fx.org, fx.owner, foreign.id, UpdateContact::default())
            .await
            .expect("update")
            .is_none());
        assert!(!service
            .delete_contact(fx.org, fx.owner, foreign.id)
            .await
            .expect("delete"));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let fx = fixture().await;
        let service = ContactService::new(fx.store.clone());
        assert!(matches!(
            service.create_contact(fx.org, fx.member, create("  ")).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
