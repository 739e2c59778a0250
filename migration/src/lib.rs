//! Database migrations for the proposals service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_01_01_000001_create_tenants;
mod m2025_11_01_100000_create_proposals;
mod m2025_11_01_100100_create_proposal_tiers;
mod m2025_11_01_100200_create_seat_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_01_01_000001_create_tenants::Migration),
            Box::new(m2025_11_01_100000_create_proposals::Migration),
            Box::new(m2025_11_01_100100_create_proposal_tiers::Migration),
            Box::new(m2025_11_01_100200_create_seat_tables::Migration),
        ]
    }
}
