//! Migration to create sponsorship tiers and their benefits.
//!
//! Both tables carry a `position` column; display order is
//! `(position, created_at)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProposalTiers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProposalTiers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProposalTiers::ProposalId).uuid().not_null())
                    .col(ColumnDef::new(ProposalTiers::Name).text().not_null())
                    .col(ColumnDef::new(ProposalTiers::PriceCents).big_integer().null())
                    .col(
                        ColumnDef::new(ProposalTiers::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProposalTiers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_proposal_tiers_proposal_id")
                            .from(ProposalTiers::Table, ProposalTiers::ProposalId)
                            .to(Proposals::Table, Proposals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_proposal_tiers_proposal_position")
                    .table(ProposalTiers::Table)
                    .col(ProposalTiers::ProposalId)
                    .col(ProposalTiers::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TierBenefits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TierBenefits::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TierBenefits::TierId).uuid().not_null())
                    .col(ColumnDef::new(TierBenefits::Description).text().not_null())
                    .col(
                        ColumnDef::new(TierBenefits::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TierBenefits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tier_benefits_tier_id")
                            .from(TierBenefits::Table, TierBenefits::TierId)
                            .to(ProposalTiers::Table, ProposalTiers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tier_benefits_tier_position")
                    .table(TierBenefits::Table)
                    .col(TierBenefits::TierId)
                    .col(TierBenefits::Position)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tier_benefits_tier_position")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(TierBenefits::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_proposal_tiers_proposal_position")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ProposalTiers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProposalTiers {
    Table,
    Id,
    ProposalId,
    Name,
    PriceCents,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TierBenefits {
    Table,
    Id,
    TierId,
    Description,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Proposals {
    Table,
    Id,
}
