//! Migration to create the proposals table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Proposals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Proposals::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Proposals::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Proposals::Title).text().not_null())
                    .col(ColumnDef::new(Proposals::Summary).text().null())
                    .col(
                        ColumnDef::new(Proposals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_proposals_tenant_id")
                            .from(Proposals::Table, Proposals::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Usage counting and public page loading both filter by tenant
        manager
            .create_index(
                Index::create()
                    .name("idx_proposals_tenant_id")
                    .table(Proposals::Table)
                    .col(Proposals::TenantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_proposals_tenant_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Proposals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Proposals {
    Table,
    Id,
    TenantId,
    Title,
    Summary,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
