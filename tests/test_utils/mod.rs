//! Test utilities for database testing.
//!
//! In-memory SQLite databases with all migrations applied, plus fixture
//! helpers for tenants and plan-limited seats.

use anyhow::Result;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use proposals::models::{api_key, team_member, tenant::Model as TenantModel};
use proposals::plans::PlanTier;
use proposals::repositories::TenantRepository;
use sea_orm::{Database, DatabaseConnection, EntityTrait, IntoActiveModel};
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Creates a tenant on `tier`, optionally bound to `subdomain`.
#[allow(dead_code)]
pub async fn create_test_tenant(
    db: &Arc<DatabaseConnection>,
    tier: PlanTier,
    subdomain: Option<&str>,
) -> Result<TenantModel> {
    let repo = TenantRepository::new(Arc::clone(db));
    let tenant = repo.create(Some("Test Tenant".to_string()), tier).await?;
    Ok(match subdomain {
        Some(label) => repo.bind_subdomain(tenant.id, label).await?,
        None => tenant,
    })
}

#[allow(dead_code)]
pub async fn insert_api_key(db: &DatabaseConnection, tenant_id: Uuid, name: &str) -> Result<()> {
    let model = api_key::Model {
        id: Uuid::new_v4(),
        tenant_id,
        name: name.to_string(),
        created_at: Utc::now().into(),
    };
    api_key::Entity::insert(model.into_active_model())
        .exec_without_returning(db)
        .await?;
    Ok(())
}

#[allow(dead_code)]
pub async fn insert_team_member(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    email: &str,
) -> Result<()> {
    let model = team_member::Model {
        id: Uuid::new_v4(),
        tenant_id,
        email: email.to_string(),
        created_at: Utc::now().into(),
    };
    team_member::Entity::insert(model.into_active_model())
        .exec_without_returning(db)
        .await?;
    Ok(())
}
