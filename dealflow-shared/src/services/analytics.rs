//! Deal analytics: closed-deal summary and funnel counts, with a small
//! per-tenant cache in front of the aggregate queries.
//!
//! The cache is keyed by organization, TTL-bounded, and capacity-bounded;
//! results may lag mutations by at most the TTL. The membership gate runs
//! before any cache lookup, so a cached entry never leaks across tenants.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::deal::{DealSummary, StageCount};
use crate::store::Store;

use super::{require_membership, ServiceResult};

/// TTL'd, capacity-bounded map keyed by organization id. When full, the
/// oldest entry is evicted to make room.
struct TtlMap<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<Uuid, (Instant, V)>>,
}

impl<V: Clone> TtlMap<V> {
    fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: Uuid) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: Uuid, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, (stored_at, _))| *stored_at)
                .map(|(k, _)| *k)
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (Instant::now(), value));
    }
}

/// Cache for both analytics reads. Construct once at startup and share
/// behind an `Arc`.
pub struct AnalyticsCache {
    summary: TtlMap<DealSummary>,
    funnel: TtlMap<Vec<StageCount>>,
}

impl AnalyticsCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            summary: TtlMap::new(ttl, capacity),
            funnel: TtlMap::new(ttl, capacity),
        }
    }
}

pub struct AnalyticsService {
    store: Arc<dyn Store>,
    cache: Arc<AnalyticsCache>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<AnalyticsCache>) -> Self {
        Self { store, cache }
    }

    /// Count, total value, and average value over the organization's
    /// closed deals.
    pub async fn summary(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<DealSummary> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if let Some(summary) = self.cache.summary.get(organization_id) {
            return Ok(summary);
        }
        let summary = self.store.deal_summary(organization_id).await?;
        self.cache.summary.put(organization_id, summary.clone());
        Ok(summary)
    }

    /// Deal count per funnel stage, zero-filled across the stage
    /// vocabulary.
    pub async fn funnel(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Vec<StageCount>> {
        require_membership(self.store.as_ref(), organization_id, user_id).await?;
        if let Some(funnel) = self.cache.funnel.get(organization_id) {
            return Ok(funnel);
        }
        let funnel = self.store.deal_funnel(organization_id).await?;
        self.cache.funnel.put(organization_id, funnel.clone());
        Ok(funnel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contact::{Contact, CreateContact};
    use crate::models::deal::CreateDeal;
    use crate::services::deal::DealService;
    use crate::services::testutil::{fixture, Fixture};
    use crate::services::ServiceError;

    async fn close_one_deal(fx: &Fixture, value: f64) {
        let deals = DealService::new(fx.store.clone());
        let contact = Contact::new(
            fx.org,
            CreateContact {
                name: "Ada".to_string(),
                ..Default::default()
            },
        );
        let contact_id = contact.id;
        fx.store.insert_contact(contact).await.expect("contact");
        let deal = deals
            .create_deal(
                fx.org,
                fx.owner,
                CreateDeal {
                    contact_id,
                    title: "Pilot".to_string(),
                    value: Some(value),
                    stage: None,
                    notes: None,
                },
            )
            .await
            .expect("create");
        deals
            .close_deal(fx.org, fx.owner, deal.id)
            .await
            .expect("close");
    }

    fn service(fx: &Fixture, ttl: Duration) -> AnalyticsService {
        AnalyticsService::new(fx.store.clone(), Arc::new(AnalyticsCache::new(ttl, 16)))
    }

    #[tokio::test]
    async fn test_summary_and_funnel() {
        let fx = fixture().await;
        let analytics = service(&fx, Duration::from_secs(30));
        close_one_deal(&fx, 500.0).await;

        let summary = analytics.summary(fx.org, fx.member).await.expect("summary");
        assert_eq!(summary.total, 1);
        assert_eq!(summary.total_value, 500.0);

        let funnel = analytics.funnel(fx.org, fx.member).await.expect("funnel");
        assert_eq!(funnel.len(), 5);
        assert_eq!(funnel[0].stage, "new");
        assert_eq!(funnel[0].count, 1);
    }

    #[tokio::test]
    async fn test_gate_runs_before_cache() {
        let fx = fixture().await;
        let analytics = service(&fx, Duration::from_secs(30));
        close_one_deal(&fx, 500.0).await;

        // Warm the cache as a member, then confirm an outsider is still
        // denied rather than served the cached value.
        analytics.summary(fx.org, fx.member).await.expect("summary");
        assert!(matches!(
            analytics.summary(fx.org, fx.outsider).await,
            Err(ServiceError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_cached_value_served_within_ttl() {
        let fx = fixture().await;
        let analytics = service(&fx, Duration::from_secs(30));
        close_one_deal(&fx, 500.0).await;

        let before = analytics.summary(fx.org, fx.member).await.expect("summary");
        close_one_deal(&fx, 700.0).await;
        let cached = analytics.summary(fx.org, fx.member).await.expect("summary");
        assert_eq!(cached, before);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_recomputes() {
        let fx = fixture().await;
        let analytics = service(&fx, Duration::ZERO);
        close_one_deal(&fx, 500.0).await;

        assert_eq!(
            analytics
                .summary(fx.org, fx.member)
                .await
                .expect("summary")
                .total,
            1
        );
        close_one_deal(&fx, 700.0).await;
        assert_eq!(
            analytics
                .summary(fx.org, fx.member)
                .await
                .expect("summary")
                .total,
            2
        );
    }

    #[test]
    fn test_ttl_map_capacity_bound() {
        let map: TtlMap<i32> = TtlMap::new(Duration::from_secs(60), 2);
        let keys: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        map.put(keys[0], 0);
        std::thread::sleep(Duration::from_millis(5));
        map.put(keys[1], 1);
        std::thread::sleep(Duration::from_millis(5));
        map.put(keys[2], 2);

        let entries = map.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        // The oldest entry was evicted.
        assert!(!entries.contains_key(&keys[0]));
    }
}
