//! # Usage Repository
//!
//! Current per-tenant usage of every plan-limited resource.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{api_key, proposal, team_member, tenant};
use crate::plans::ResourceKind;

/// Source of the current count for a plan-limited resource.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn count(&self, tenant_id: Uuid, resource: ResourceKind) -> Result<u64, DbErr>;
}

/// Counts rows owned by the tenant.
#[derive(Debug, Clone)]
pub struct UsageRepository {
    db: Arc<DatabaseConnection>,
}

impl UsageRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageSource for UsageRepository {
    async fn count(&self, tenant_id: Uuid, resource: ResourceKind) -> Result<u64, DbErr> {
        let db = &*self.db;
        match resource {
            ResourceKind::Proposals => {
                proposal::Entity::find()
                    .filter(proposal::Column::TenantId.eq(tenant_id))
                    .count(db)
                    .await
            }
            ResourceKind::ApiKeys => {
                api_key::Entity::find()
                    .filter(api_key::Column::TenantId.eq(tenant_id))
                    .count(db)
                    .await
            }
            ResourceKind::TeamMembers => {
                team_member::Entity::find()
                    .filter(team_member::Column::TenantId.eq(tenant_id))
                    .count(db)
                    .await
            }
            // A tenant has at most one custom domain binding.
            ResourceKind::CustomDomains => {
                tenant::Entity::find_by_id(tenant_id)
                    .filter(tenant::Column::CustomDomain.is_not_null())
                    .count(db)
                    .await
            }
        }
    }
}
