//! Tenant lookup for resolved hostnames.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use sea_orm::DbErr;

use super::{DomainMatch, DomainResolver, DomainStatus};
use crate::models::tenant::Model as TenantModel;

/// Read access to tenants by hosting identity.
#[async_trait]
pub trait TenantLookup: Send + Sync {
    async fn find_by_subdomain(&self, name: &str) -> Result<Option<TenantModel>, DbErr>;

    async fn find_by_custom_domain(&self, hostname: &str) -> Result<Option<TenantModel>, DbErr>;
}

/// Hostname resolved all the way to a tenant (or not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostResolution {
    Primary,
    Reserved,
    Tenant {
        tenant: TenantModel,
        matched: DomainMatch,
    },
    NoMatch,
}

impl HostResolution {
    pub fn kind(&self) -> &'static str {
        match self {
            HostResolution::Primary => "primary",
            HostResolution::Reserved => "reserved",
            HostResolution::Tenant { matched, .. } => matched.kind(),
            HostResolution::NoMatch => "no_match",
        }
    }

    pub fn tenant(&self) -> Option<&TenantModel> {
        match self {
            HostResolution::Tenant { tenant, .. } => Some(tenant),
            _ => None,
        }
    }
}

/// Combines the pure [`DomainResolver`] with a [`TenantLookup`].
#[derive(Clone)]
pub struct TenantResolver {
    resolver: Arc<DomainResolver>,
    lookup: Arc<dyn TenantLookup>,
}

impl TenantResolver {
    pub fn new(resolver: Arc<DomainResolver>, lookup: Arc<dyn TenantLookup>) -> Self {
        Self { resolver, lookup }
    }

    pub fn domain_resolver(&self) -> &DomainResolver {
        &self.resolver
    }

    /// Resolves `hostname` to a tenant. Subdomain and custom-domain matches
    /// without a tenant become `NoMatch`; custom domains must be verified.
    pub async fn resolve(&self, hostname: &str) -> Result<HostResolution, DbErr> {
        let matched = self.resolver.resolve(hostname);

        let resolution = match &matched {
            DomainMatch::Primary => HostResolution::Primary,
            DomainMatch::Reserved => HostResolution::Reserved,
            DomainMatch::NoMatch => HostResolution::NoMatch,
            DomainMatch::Subdomain(name) => match self.lookup.find_by_subdomain(name).await? {
                Some(tenant) => HostResolution::Tenant {
                    tenant,
                    matched: matched.clone(),
                },
                None => HostResolution::NoMatch,
            },
            DomainMatch::CustomDomain(host) => {
                match self.lookup.find_by_custom_domain(host).await? {
                    Some(tenant) if tenant.domain_status == Some(DomainStatus::Verified) => {
                        HostResolution::Tenant {
                            tenant,
                            matched: matched.clone(),
                        }
                    }
                    Some(tenant) => {
                        tracing::debug!(
                            tenant_id = %tenant.id,
                            host = %host,
                            status = ?tenant.domain_status,
                            "Custom domain is bound but not verified"
                        );
                        HostResolution::NoMatch
                    }
                    None => HostResolution::NoMatch,
                }
            }
        };

        counter!("host_resolution_total", "kind" => resolution.kind()).increment(1);
        Ok(resolution)
    }
}
