mod test_utils;

use std::sync::Arc;

use proposals::domains::{DomainError, DomainResolver, DomainStatus};
use proposals::plans::{PlanTier, ResourceKind};
use proposals::repositories::{
    ProposalRepository, RepositoryError, TenantRepository, UsageRepository, UsageSource,
};
use test_utils::{create_test_tenant, insert_api_key, insert_team_member, setup_test_db_arc};
use uuid::Uuid;

fn resolver() -> DomainResolver {
    DomainResolver::new("example.com").unwrap()
}

#[tokio::test]
async fn subdomains_are_normalized_and_unique() {
    let db = setup_test_db_arc().await.unwrap();
    let repo = TenantRepository::new(Arc::clone(&db));
    let first = create_test_tenant(&db, PlanTier::Free, None).await.unwrap();
    let second = create_test_tenant(&db, PlanTier::Free, None).await.unwrap();

    let bound = repo.bind_subdomain(first.id, " TechTalks ").await.unwrap();
    assert_eq!(bound.subdomain.as_deref(), Some("techtalks"));

    // Rebinding the same label is a no-op for the owner.
    repo.bind_subdomain(first.id, "techtalks").await.unwrap();

    let err = repo.bind_subdomain(second.id, "techtalks").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let err = repo.bind_subdomain(second.id, "www").await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Domain(DomainError::ReservedSubdomain(_))
    ));

    let err = repo.bind_subdomain(second.id, "tech_talks").await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Domain(DomainError::InvalidSubdomain { .. })
    ));

    let found = repo.find_by_subdomain("techtalks").await.unwrap().unwrap();
    assert_eq!(found.id, first.id);

    let cleared = repo.clear_subdomain(first.id).await.unwrap();
    assert!(cleared.subdomain.is_none());
    assert!(repo.find_by_subdomain("techtalks").await.unwrap().is_none());
}

#[tokio::test]
async fn missing_tenant_is_reported() {
    let db = setup_test_db_arc().await.unwrap();
    let repo = TenantRepository::new(db);

    let err = repo
        .bind_subdomain(Uuid::new_v4(), "techtalks")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound("Tenant")));
    assert!(!repo.increment_view_count(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn custom_domain_binding_follows_status_machine() {
    let db = setup_test_db_arc().await.unwrap();
    let repo = TenantRepository::new(Arc::clone(&db));
    let tenant = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let resolver = resolver();

    let err = repo
        .update_domain_status(tenant.id, DomainStatus::Verifying)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound("Custom domain")));

    let bound = repo
        .bind_custom_domain(tenant.id, &resolver, "Sponsors.TechTalks.io.")
        .await
        .unwrap();
    assert_eq!(bound.custom_domain.as_deref(), Some("sponsors.techtalks.io"));
    assert_eq!(bound.domain_status, Some(DomainStatus::Pending));

    let err = repo
        .update_domain_status(tenant.id, DomainStatus::Verified)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Domain(DomainError::InvalidTransition {
            from: DomainStatus::Pending,
            to: DomainStatus::Verified,
        })
    ));

    repo.update_domain_status(tenant.id, DomainStatus::Verifying)
        .await
        .unwrap();
    let failed = repo
        .update_domain_status(tenant.id, DomainStatus::Failed)
        .await
        .unwrap();
    assert_eq!(failed.domain_status, Some(DomainStatus::Failed));

    // Rebinding starts verification over.
    let rebound = repo
        .bind_custom_domain(tenant.id, &resolver, "sponsors.techtalks.io")
        .await
        .unwrap();
    assert_eq!(rebound.domain_status, Some(DomainStatus::Pending));

    let cleared = repo.clear_custom_domain(tenant.id).await.unwrap();
    assert!(cleared.custom_domain.is_none());
    assert!(cleared.domain_status.is_none());
}

#[tokio::test]
async fn custom_domain_cannot_be_shared_or_shadow_the_platform() {
    let db = setup_test_db_arc().await.unwrap();
    let repo = TenantRepository::new(Arc::clone(&db));
    let owner = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let other = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let resolver = resolver();

    repo.bind_custom_domain(owner.id, &resolver, "sponsors.techtalks.io")
        .await
        .unwrap();
    let err = repo
        .bind_custom_domain(other.id, &resolver, "sponsors.techtalks.io")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    for hostname in [
        "example.com",
        "news.example.com",
        "sponsors.io:443",
        "127.0.0.1",
    ] {
        let err = repo
            .bind_custom_domain(other.id, &resolver, hostname)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                RepositoryError::Domain(DomainError::InvalidCustomDomain { .. })
            ),
            "hostname {hostname}"
        );
    }
}

#[tokio::test]
async fn view_count_increments_atomically() {
    let db = setup_test_db_arc().await.unwrap();
    let repo = TenantRepository::new(Arc::clone(&db));
    let tenant = create_test_tenant(&db, PlanTier::Free, Some("techtalks"))
        .await
        .unwrap();

    for _ in 0..3 {
        assert!(repo.increment_view_count(tenant.id).await.unwrap());
    }
    let reloaded = repo.get(tenant.id).await.unwrap().unwrap();
    assert_eq!(reloaded.view_count, 3);
}

#[tokio::test]
async fn usage_counts_rows_per_tenant() {
    let db = setup_test_db_arc().await.unwrap();
    let tenant = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let other = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let proposals = ProposalRepository::new(Arc::clone(&db));
    let usage = UsageRepository::new(Arc::clone(&db));

    proposals
        .create(tenant.id, "One".to_string(), None)
        .await
        .unwrap();
    proposals
        .create(tenant.id, "Two".to_string(), None)
        .await
        .unwrap();
    proposals
        .create(other.id, "Elsewhere".to_string(), None)
        .await
        .unwrap();
    insert_api_key(&db, tenant.id, "ci").await.unwrap();
    insert_team_member(&db, tenant.id, "ana@techtalks.io")
        .await
        .unwrap();
    insert_team_member(&db, tenant.id, "bo@techtalks.io")
        .await
        .unwrap();

    assert_eq!(usage.count(tenant.id, ResourceKind::Proposals).await.unwrap(), 2);
    assert_eq!(usage.count(tenant.id, ResourceKind::ApiKeys).await.unwrap(), 1);
    assert_eq!(usage.count(tenant.id, ResourceKind::TeamMembers).await.unwrap(), 2);
    assert_eq!(usage.count(tenant.id, ResourceKind::CustomDomains).await.unwrap(), 0);

    TenantRepository::new(Arc::clone(&db))
        .bind_custom_domain(tenant.id, &resolver(), "sponsors.techtalks.io")
        .await
        .unwrap();
    assert_eq!(usage.count(tenant.id, ResourceKind::CustomDomains).await.unwrap(), 1);
    assert_eq!(usage.count(other.id, ResourceKind::CustomDomains).await.unwrap(), 0);
}

#[tokio::test]
async fn public_page_orders_tiers_and_benefits() {
    let db = setup_test_db_arc().await.unwrap();
    let tenant = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let repo = ProposalRepository::new(Arc::clone(&db));

    let proposal = repo
        .create(tenant.id, "DevConf".to_string(), Some("Three days".to_string()))
        .await
        .unwrap();
    let silver = repo
        .add_tier(tenant.id, proposal.id, "Silver".to_string(), Some(100_000), None)
        .await
        .unwrap();
    let gold = repo
        .add_tier(tenant.id, proposal.id, "Gold".to_string(), Some(250_000), None)
        .await
        .unwrap();
    assert_eq!((silver.position, gold.position), (0, 1));

    repo.add_benefit(tenant.id, gold.id, "Keynote slot".to_string(), Some(5))
        .await
        .unwrap();
    repo.add_benefit(tenant.id, gold.id, "Booth".to_string(), Some(1))
        .await
        .unwrap();

    let page = repo.load_public_page(tenant.id).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].summary.as_deref(), Some("Three days"));
    let names: Vec<_> = page[0].tiers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Silver", "Gold"]);
    assert!(page[0].tiers[0].benefits.is_empty());
    assert_eq!(page[0].tiers[1].benefits, ["Booth", "Keynote slot"]);

    assert!(repo.load_public_page(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn proposals_are_scoped_to_their_tenant() {
    let db = setup_test_db_arc().await.unwrap();
    let owner = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let intruder = create_test_tenant(&db, PlanTier::Pro, None).await.unwrap();
    let repo = ProposalRepository::new(Arc::clone(&db));

    let proposal = repo
        .create(owner.id, "DevConf".to_string(), None)
        .await
        .unwrap();
    let tier = repo
        .add_tier(owner.id, proposal.id, "Gold".to_string(), None, None)
        .await
        .unwrap();

    let err = repo
        .add_tier(intruder.id, proposal.id, "Fake".to_string(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound("Proposal")));

    let err = repo
        .add_benefit(intruder.id, tier.id, "Fake".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound("Tier")));

    assert!(!repo.delete(intruder.id, proposal.id).await.unwrap());
    assert!(repo.delete(owner.id, proposal.id).await.unwrap());
    assert_eq!(repo.count_for_tenant(owner.id).await.unwrap(), 0);
}
