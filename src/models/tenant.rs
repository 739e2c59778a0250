//! Tenant entity model
//!
//! A tenant owns proposals and a hosting identity. `subdomain` and
//! `custom_domain` are each unique across tenants and may coexist.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::domains::DomainStatus;
use crate::plans::PlanTier;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the tenant (optional)
    pub name: Option<String>,

    /// Subscription plan
    pub plan_tier: PlanTier,

    /// Subdomain label under the platform base domain
    #[sea_orm(unique)]
    pub subdomain: Option<String>,

    /// Tenant-owned hostname
    #[sea_orm(unique)]
    pub custom_domain: Option<String>,

    /// Verification state of `custom_domain`; `None` when no custom domain is bound
    pub domain_status: Option<DomainStatus>,

    /// Public page views
    pub view_count: i64,

    /// Timestamp when the tenant was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::proposal::Entity")]
    Proposal,
}

impl Related<super::proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
