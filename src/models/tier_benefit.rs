//! Tier benefit entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// A single benefit line within a sponsorship tier
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tier_benefits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tier_id: Uuid,

    pub description: String,

    pub position: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proposal_tier::Entity",
        from = "Column::TierId",
        to = "super::proposal_tier::Column::Id"
    )]
    ProposalTier,
}

impl Related<super::proposal_tier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProposalTier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
