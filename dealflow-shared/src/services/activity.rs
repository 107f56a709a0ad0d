//! Activity log reads. Membership-gated, newest first.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::activity::Activity;
use crate::store::{Page, Store};

use super::{require_membership, ServiceResult};

pub struct ActivityService {
    store: Arc<dyn Store>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn activities(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        page: Page,
    ) -> ServiceResult<Vec<Activity>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .activities_by_organization(organization_id, page)
            .await?)
    }

    /// The activity trail of one deal. A deal id from another organization
    /// yields an empty list, same as an unknown id.
    pub async fn deal_activities(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        deal_id: Uuid,
        page: Page,
    ) -> ServiceResult<Vec<Activity>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        Ok(self
            .store
            .activities_by_deal(organization_id, deal_id, page)
            .await?)
    }
}
