//! # Proposal Repository
//!
//! Proposals, their sponsorship tiers and tier benefits. Every operation is
//! scoped to the owning tenant.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::proposal::{self, Entity as Proposal, Model as ProposalModel};
use crate::models::proposal_tier::{self, Entity as ProposalTier, Model as TierModel};
use crate::models::tier_benefit::{self, Entity as TierBenefit, Model as BenefitModel};

/// Proposal as rendered on a tenant's public page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublicProposal {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub tiers: Vec<PublicTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublicTier {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    pub benefits: Vec<String>,
}

/// Repository for proposal database operations
#[derive(Debug, Clone)]
pub struct ProposalRepository {
    db: Arc<DatabaseConnection>,
}

impl ProposalRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        title: String,
        summary: Option<String>,
    ) -> Result<ProposalModel, DbErr> {
        let model = ProposalModel {
            id: Uuid::new_v4(),
            tenant_id,
            title,
            summary,
            created_at: Utc::now().into(),
        };

        Proposal::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        Ok(model)
    }

    /// Delete a proposal; tiers and benefits go with it. Returns false when
    /// the tenant owns no such proposal.
    pub async fn delete(&self, tenant_id: Uuid, proposal_id: Uuid) -> Result<bool, DbErr> {
        let result = Proposal::delete_many()
            .filter(proposal::Column::Id.eq(proposal_id))
            .filter(proposal::Column::TenantId.eq(tenant_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<ProposalModel>, DbErr> {
        Proposal::find()
            .filter(proposal::Column::TenantId.eq(tenant_id))
            .order_by_asc(proposal::Column::CreatedAt)
            .all(&*self.db)
            .await
    }

    pub async fn count_for_tenant(&self, tenant_id: Uuid) -> Result<u64, DbErr> {
        Proposal::find()
            .filter(proposal::Column::TenantId.eq(tenant_id))
            .count(&*self.db)
            .await
    }

    async fn owned_proposal(
        &self,
        tenant_id: Uuid,
        proposal_id: Uuid,
    ) -> Result<ProposalModel, RepositoryError> {
        Proposal::find_by_id(proposal_id)
            .filter(proposal::Column::TenantId.eq(tenant_id))
            .one(&*self.db)
            .await?
            .ok_or(RepositoryError::NotFound("Proposal"))
    }

    /// Append a tier to a proposal. Without an explicit position the tier
    /// goes after the existing ones.
    pub async fn add_tier(
        &self,
        tenant_id: Uuid,
        proposal_id: Uuid,
        name: String,
        price_cents: Option<i64>,
        position: Option<i32>,
    ) -> Result<TierModel, RepositoryError> {
        let proposal = self.owned_proposal(tenant_id, proposal_id).await?;

        let position = match position {
            Some(position) => position,
            None => ProposalTier::find()
                .filter(proposal_tier::Column::ProposalId.eq(proposal.id))
                .count(&*self.db)
                .await? as i32,
        };

        let model = TierModel {
            id: Uuid::new_v4(),
            proposal_id: proposal.id,
            name,
            price_cents,
            position,
            created_at: Utc::now().into(),
        };

        ProposalTier::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        Ok(model)
    }

    pub async fn add_benefit(
        &self,
        tenant_id: Uuid,
        tier_id: Uuid,
        description: String,
        position: Option<i32>,
    ) -> Result<BenefitModel, RepositoryError> {
        let tier = ProposalTier::find_by_id(tier_id)
            .one(&*self.db)
            .await?
            .ok_or(RepositoryError::NotFound("Tier"))?;
        // Tiers of another tenant's proposal are reported as missing.
        self.owned_proposal(tenant_id, tier.proposal_id)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound(_) => RepositoryError::NotFound("Tier"),
                other => other,
            })?;

        let position = match position {
            Some(position) => position,
            None => TierBenefit::find()
                .filter(tier_benefit::Column::TierId.eq(tier.id))
                .count(&*self.db)
                .await? as i32,
        };

        let model = BenefitModel {
            id: Uuid::new_v4(),
            tier_id: tier.id,
            description,
            position,
            created_at: Utc::now().into(),
        };

        TierBenefit::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        Ok(model)
    }

    /// Load everything a tenant's public page shows, with tiers and benefits
    /// in `(position, created_at)` order.
    pub async fn load_public_page(&self, tenant_id: Uuid) -> Result<Vec<PublicProposal>, DbErr> {
        let proposals = self.list_for_tenant(tenant_id).await?;
        if proposals.is_empty() {
            return Ok(Vec::new());
        }

        let proposal_ids: Vec<Uuid> = proposals.iter().map(|p| p.id).collect();
        let tiers = ProposalTier::find()
            .filter(proposal_tier::Column::ProposalId.is_in(proposal_ids))
            .order_by_asc(proposal_tier::Column::Position)
            .order_by_asc(proposal_tier::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let tier_ids: Vec<Uuid> = tiers.iter().map(|t| t.id).collect();
        let benefits = if tier_ids.is_empty() {
            Vec::new()
        } else {
            TierBenefit::find()
                .filter(tier_benefit::Column::TierId.is_in(tier_ids))
                .order_by_asc(tier_benefit::Column::Position)
                .order_by_asc(tier_benefit::Column::CreatedAt)
                .all(&*self.db)
                .await?
        };

        let mut benefits_by_tier: HashMap<Uuid, Vec<String>> = HashMap::new();
        for benefit in benefits {
            benefits_by_tier
                .entry(benefit.tier_id)
                .or_default()
                .push(benefit.description);
        }

        let mut tiers_by_proposal: HashMap<Uuid, Vec<PublicTier>> = HashMap::new();
        for tier in tiers {
            let benefits = benefits_by_tier.remove(&tier.id).unwrap_or_default();
            tiers_by_proposal
                .entry(tier.proposal_id)
                .or_default()
                .push(PublicTier {
                    id: tier.id,
                    name: tier.name,
                    price_cents: tier.price_cents,
                    benefits,
                });
        }

        Ok(proposals
            .into_iter()
            .map(|proposal| PublicProposal {
                tiers: tiers_by_proposal.remove(&proposal.id).unwrap_or_default(),
                id: proposal.id,
                title: proposal.title,
                summary: proposal.summary,
            })
            .collect())
    }
}
