//! Organizations and membership management.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::membership::{Membership, Role};
use crate::models::organization::Organization;
use crate::store::{Store, StoreError};

use super::{require_membership, ServiceError, ServiceResult};

/// Organization lifecycle and member administration.
pub struct OrganizationService {
    store: Arc<dyn Store>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an organization. The creator becomes its `owner`; the
    /// organization and the owner membership are written atomically.
    pub async fn create_organization(
        &self,
        creator_id: Uuid,
        name: &str,
    ) -> ServiceResult<Organization> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "organization name is required".into(),
            ));
        }
        let organization = Organization::new(name.to_string());
        let owner = Membership::new(organization.id, creator_id, Role::Owner);
        let organization = self.store.insert_organization(organization, owner).await?;
        tracing::info!(
            organization_id = %organization.id,
            owner_id = %creator_id,
            "organization created"
        );
        Ok(organization)
    }

    /// Fetches an organization, members only. A non-member gets
    /// `AccessDenied` whether or not the organization exists.
    pub async fn organization(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Option<Organization>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self.store.organization_by_id(organization_id).await?)
    }

    /// Lists the organization's members, members only.
    pub async fn members(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Vec<Membership>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .memberships_by_organization(organization_id)
            .await?)
    }

    /// Adds a user to the organization with the given role.
    ///
    /// Gates run in a fixed order: the actor must be a member
    /// (`AccessDenied`), then an owner or admin (`InsufficientPermission`),
    /// then the role string must parse (`InvalidRole`), then the target
    /// must not already belong (`AlreadyMember`). `Ok(None)` means the
    /// target user does not exist.
    pub async fn add_member(
        &self,
        organization_id: Uuid,
        actor_id: Uuid,
        user_id: Uuid,
        role: &str,
    ) -> ServiceResult<Option<Membership>> {
        let actor = require_membership(self.store.as_ref(), organization_id, actor_id).await?;
        if !actor.role.can_manage_members() {
            return Err(ServiceError::InsufficientPermission);
        }
        let role = Role::parse(role).ok_or_else(|| ServiceError::InvalidRole(role.to_string()))?;

        if self.store.user_by_id(user_id).await?.is_none() {
            return Ok(None);
        }
        if self
            .store
            .membership(organization_id, user_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyMember);
        }

        let membership = Membership::new(organization_id, user_id, role);
        match self.store.insert_membership(membership).await {
            Ok(membership) => Ok(Some(membership)),
            // Lost a race with a concurrent add of the same user.
            Err(StoreError::Conflict(_)) => Err(ServiceError::AlreadyMember),
            Err(e) => Err(e.into()),
        }
    }
}
