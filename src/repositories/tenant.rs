//! # Tenant Repository
//!
//! Tenant records and their hosting identity. Subdomain and custom-domain
//! bindings are validated here before they reach the unique indexes.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryError;
use crate::domains::{DomainResolver, DomainStatus, TenantLookup, validate_subdomain};
use crate::models::tenant::{self, Entity as Tenant, Model as TenantModel};
use crate::plans::PlanTier;

/// Repository for tenant database operations
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: Arc<DatabaseConnection>,
}

impl TenantRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a tenant with no hosting identity
    pub async fn create(
        &self,
        name: Option<String>,
        plan_tier: PlanTier,
    ) -> Result<TenantModel, DbErr> {
        let model = TenantModel {
            id: Uuid::new_v4(),
            name,
            plan_tier,
            subdomain: None,
            custom_domain: None,
            domain_status: None,
            view_count: 0,
            created_at: Utc::now().into(),
        };

        Tenant::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        tracing::info!(tenant_id = %model.id, plan_tier = %plan_tier, "Created tenant");
        Ok(model)
    }

    pub async fn get(&self, tenant_id: Uuid) -> Result<Option<TenantModel>, DbErr> {
        Tenant::find_by_id(tenant_id).one(&*self.db).await
    }

    async fn require(&self, tenant_id: Uuid) -> Result<TenantModel, RepositoryError> {
        self.get(tenant_id)
            .await?
            .ok_or(RepositoryError::NotFound("Tenant"))
    }

    /// Find the tenant owning a subdomain label (already normalized)
    pub async fn find_by_subdomain(&self, name: &str) -> Result<Option<TenantModel>, DbErr> {
        Tenant::find()
            .filter(tenant::Column::Subdomain.eq(name))
            .one(&*self.db)
            .await
    }

    /// Find the tenant owning a custom hostname (already normalized)
    pub async fn find_by_custom_domain(
        &self,
        hostname: &str,
    ) -> Result<Option<TenantModel>, DbErr> {
        Tenant::find()
            .filter(tenant::Column::CustomDomain.eq(hostname))
            .one(&*self.db)
            .await
    }

    /// Bind (or replace) the tenant's subdomain.
    pub async fn bind_subdomain(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<TenantModel, RepositoryError> {
        let name = validate_subdomain(name)?;
        let tenant = self.require(tenant_id).await?;

        if let Some(owner) = self.find_by_subdomain(&name).await? {
            if owner.id == tenant_id {
                return Ok(owner);
            }
            return Err(RepositoryError::Conflict(format!(
                "Subdomain '{name}' is already taken"
            )));
        }

        let mut active = tenant.into_active_model();
        active.subdomain = Set(Some(name.clone()));
        let updated = active.update(&*self.db).await?;

        tracing::info!(tenant_id = %tenant_id, subdomain = %name, "Bound subdomain");
        Ok(updated)
    }

    pub async fn clear_subdomain(&self, tenant_id: Uuid) -> Result<TenantModel, RepositoryError> {
        let tenant = self.require(tenant_id).await?;
        if tenant.subdomain.is_none() {
            return Ok(tenant);
        }

        let mut active = tenant.into_active_model();
        active.subdomain = Set(None);
        Ok(active.update(&*self.db).await?)
    }

    /// Bind (or replace) the tenant's custom domain. A new binding always
    /// starts verification over from `pending`.
    pub async fn bind_custom_domain(
        &self,
        tenant_id: Uuid,
        resolver: &DomainResolver,
        hostname: &str,
    ) -> Result<TenantModel, RepositoryError> {
        let hostname = resolver.validate_custom_domain(hostname)?;
        let tenant = self.require(tenant_id).await?;

        if let Some(owner) = self.find_by_custom_domain(&hostname).await?
            && owner.id != tenant_id
        {
            return Err(RepositoryError::Conflict(format!(
                "Custom domain '{hostname}' is already bound to another tenant"
            )));
        }

        let mut active = tenant.into_active_model();
        active.custom_domain = Set(Some(hostname.clone()));
        active.domain_status = Set(Some(DomainStatus::Pending));
        let updated = active.update(&*self.db).await?;

        tracing::info!(tenant_id = %tenant_id, custom_domain = %hostname, "Bound custom domain");
        Ok(updated)
    }

    pub async fn clear_custom_domain(
        &self,
        tenant_id: Uuid,
    ) -> Result<TenantModel, RepositoryError> {
        let tenant = self.require(tenant_id).await?;
        if tenant.custom_domain.is_none() {
            return Ok(tenant);
        }

        let mut active = tenant.into_active_model();
        active.custom_domain = Set(None);
        active.domain_status = Set(None);
        Ok(active.update(&*self.db).await?)
    }

    /// Drops both hosting bindings at once.
    pub async fn release_domains(&self, tenant_id: Uuid) -> Result<TenantModel, RepositoryError> {
        let tenant = self.require(tenant_id).await?;
        if tenant.subdomain.is_none() && tenant.custom_domain.is_none() {
            return Ok(tenant);
        }

        let mut active = tenant.into_active_model();
        active.subdomain = Set(None);
        active.custom_domain = Set(None);
        active.domain_status = Set(None);
        Ok(active.update(&*self.db).await?)
    }

    /// Move the custom domain's verification status along the state machine.
    pub async fn update_domain_status(
        &self,
        tenant_id: Uuid,
        next: DomainStatus,
    ) -> Result<TenantModel, RepositoryError> {
        let tenant = self.require(tenant_id).await?;
        let current = match (&tenant.custom_domain, tenant.domain_status) {
            (Some(_), Some(status)) => status,
            _ => return Err(RepositoryError::NotFound("Custom domain")),
        };

        let next = current.transition(next)?;
        if next == current {
            return Ok(tenant);
        }

        let mut active = tenant.into_active_model();
        active.domain_status = Set(Some(next));
        let updated = active.update(&*self.db).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            from = %current,
            to = %next,
            "Custom domain status changed"
        );
        Ok(updated)
    }

    /// Atomically bump the public page view counter; false if the tenant is gone.
    pub async fn increment_view_count(&self, tenant_id: Uuid) -> Result<bool, DbErr> {
        let result = Tenant::update_many()
            .col_expr(
                tenant::Column::ViewCount,
                Expr::col(tenant::Column::ViewCount).add(1),
            )
            .filter(tenant::Column::Id.eq(tenant_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl TenantLookup for TenantRepository {
    async fn find_by_subdomain(&self, name: &str) -> Result<Option<TenantModel>, DbErr> {
        TenantRepository::find_by_subdomain(self, name).await
    }

    async fn find_by_custom_domain(&self, hostname: &str) -> Result<Option<TenantModel>, DbErr> {
        TenantRepository::find_by_custom_domain(self, hostname).await
    }
}
