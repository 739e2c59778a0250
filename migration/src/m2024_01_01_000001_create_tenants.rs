//! Migration to create the tenants table.
//!
//! Tenants are proposal owners. Besides the plan tier they carry their hosting
//! identity: an optional subdomain under the platform base domain and an
//! optional custom domain, each unique across all tenants.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenants::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tenants::Name).text().null())
                    .col(
                        ColumnDef::new(Tenants::PlanTier)
                            .string_len(16)
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(Tenants::Subdomain).string_len(63).null())
                    .col(ColumnDef::new(Tenants::CustomDomain).string_len(253).null())
                    .col(ColumnDef::new(Tenants::DomainStatus).string_len(16).null())
                    .col(
                        ColumnDef::new(Tenants::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Tenants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_subdomain")
                    .table(Tenants::Table)
                    .col(Tenants::Subdomain)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_custom_domain")
                    .table(Tenants::Table)
                    .col(Tenants::CustomDomain)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tenants_custom_domain").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_tenants_subdomain").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Name,
    PlanTier,
    Subdomain,
    CustomDomain,
    DomainStatus,
    ViewCount,
    CreatedAt,
}
