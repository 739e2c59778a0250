//! Caching decorator for [`TenantLookup`].

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use sea_orm::DbErr;
use uuid::Uuid;

use super::TenantLookup;
use crate::cache::TaggedCache;
use crate::models::tenant::Model as TenantModel;

/// Tag carried by cached negative lookups.
pub const UNRESOLVED_TAG: &str = "unresolved";

pub fn tenant_tag(tenant_id: Uuid) -> String {
    format!("tenant:{tenant_id}")
}

/// Caches host lookups, including misses, for a bounded time.
///
/// Any change to a tenant's hosting identity must be followed by
/// [`CachedTenantLookup::invalidate_tenant`].
pub struct CachedTenantLookup {
    inner: Arc<dyn TenantLookup>,
    cache: TaggedCache<Option<TenantModel>>,
    ttl: Duration,
}

impl CachedTenantLookup {
    pub fn new(inner: Arc<dyn TenantLookup>, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TaggedCache::new(capacity),
            ttl,
        }
    }

    /// Drops cached entries for the tenant plus every cached miss, since a
    /// new binding may turn a previously unknown host into a match.
    pub async fn invalidate_tenant(&self, tenant_id: Uuid) {
        let dropped = self.cache.invalidate_by_tag(&tenant_tag(tenant_id)).await
            + self.cache.invalidate_by_tag(UNRESOLVED_TAG).await;
        tracing::debug!(tenant_id = %tenant_id, dropped, "Invalidated cached host lookups");
    }

    async fn cached(
        &self,
        key: String,
        lookup: impl Future<Output = Result<Option<TenantModel>, DbErr>>,
    ) -> Result<Option<TenantModel>, DbErr> {
        let mut missed = false;
        let result = self
            .cache
            .get_or_compute(&key, self.ttl, || {
                missed = true;
                async move {
                    let tenant = lookup.await?;
                    let tag = match &tenant {
                        Some(tenant) => tenant_tag(tenant.id),
                        None => UNRESOLVED_TAG.to_string(),
                    };
                    Ok((tenant, vec![tag]))
                }
            })
            .await;

        if missed {
            counter!("domain_cache_misses_total").increment(1);
        } else {
            counter!("domain_cache_hits_total").increment(1);
        }
        result
    }
}

#[async_trait]
impl TenantLookup for CachedTenantLookup {
    async fn find_by_subdomain(&self, name: &str) -> Result<Option<TenantModel>, DbErr> {
        self.cached(
            format!("subdomain:{name}"),
            self.inner.find_by_subdomain(name),
        )
        .await
    }

    async fn find_by_custom_domain(&self, hostname: &str) -> Result<Option<TenantModel>, DbErr> {
        self.cached(
            format!("custom:{hostname}"),
            self.inner.find_by_custom_domain(hostname),
        )
        .await
    }
}
