//! Sponsorship tier entity model
//!
//! Tiers are displayed in `(position, created_at)` order.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "proposal_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub proposal_id: Uuid,

    /// Tier name, e.g. "Gold"
    pub name: String,

    /// Price in the smallest currency unit
    pub price_cents: Option<i64>,

    pub position: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proposal::Entity",
        from = "Column::ProposalId",
        to = "super::proposal::Column::Id"
    )]
    Proposal,
    #[sea_orm(has_many = "super::tier_benefit::Entity")]
    TierBenefit,
}

impl Related<super::proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposal.def()
    }
}

impl Related<super::tier_benefit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TierBenefit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
