//! # Server Configuration
//!
//! Application state, router assembly and the serve loop.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::operator_auth_middleware;
use crate::config::{AppConfig, ConfigError};
use crate::domains::{CachedTenantLookup, TenantResolver};
use crate::handlers;
use crate::hosting::host_routing_middleware;
use crate::plans::{LimitEvaluator, PlanGate};
use crate::repositories::{ProposalRepository, TenantRepository, UsageRepository};
use crate::telemetry::trace_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub tenants: TenantRepository,
    pub proposals: ProposalRepository,
    pub plan_gate: PlanGate,
    pub resolver: TenantResolver,
    pub host_cache: Arc<CachedTenantLookup>,
}

impl AppState {
    /// Wires repositories, the plan gate and host resolution from config.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, ConfigError> {
        config.domain_cache.validate()?;
        let domain_resolver = Arc::new(config.domain_resolver()?);
        let evaluator = Arc::new(LimitEvaluator::new(Arc::new(config.plan_limits()?)));

        let db = Arc::new(db);
        let tenants = TenantRepository::new(Arc::clone(&db));
        let capacity = NonZeroUsize::new(config.domain_cache.capacity).ok_or(
            ConfigError::InvalidDomainCacheCapacity {
                value: config.domain_cache.capacity,
            },
        )?;
        let host_cache = Arc::new(CachedTenantLookup::new(
            Arc::new(tenants.clone()),
            capacity,
            Duration::from_secs(config.domain_cache.ttl_seconds),
        ));

        Ok(Self {
            proposals: ProposalRepository::new(Arc::clone(&db)),
            plan_gate: PlanGate::new(evaluator, Arc::new(UsageRepository::new(Arc::clone(&db)))),
            resolver: TenantResolver::new(domain_resolver, host_cache.clone()),
            host_cache,
            tenants,
            db,
            config: Arc::new(config),
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            host_routing_middleware,
        ));

    let operator = Router::new()
        .route("/tenants", post(handlers::tenants::create_tenant))
        .route("/tenants/{id}", get(handlers::tenants::get_tenant))
        .route("/analytics", get(handlers::tenants::get_analytics))
        .route("/plans", get(handlers::plans::list_plans))
        .route("/limits/{resource}", get(handlers::plans::get_limit))
        .route("/features/{feature}", get(handlers::plans::get_feature))
        .route(
            "/proposals",
            post(handlers::proposals::create_proposal).get(handlers::proposals::list_proposals),
        )
        .route("/proposals/{id}", delete(handlers::proposals::delete_proposal))
        .route("/proposals/{id}/tiers", post(handlers::proposals::add_tier))
        .route("/tiers/{id}/benefits", post(handlers::proposals::add_benefit))
        .route(
            "/domains/subdomain",
            put(handlers::domains::bind_subdomain).delete(handlers::domains::clear_subdomain),
        )
        .route(
            "/domains/custom",
            put(handlers::domains::bind_custom_domain)
                .delete(handlers::domains::clear_custom_domain),
        )
        .route(
            "/domains/custom/status",
            put(handlers::domains::update_custom_domain_status),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.config),
            operator_auth_middleware,
        ));

    Router::new()
        .merge(public)
        .route("/healthz", get(handlers::healthz))
        .nest("/api/v1", operator)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let profile = config.profile.clone();
    let app = create_app(AppState::new(config, db)?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::get_analytics,
        crate::handlers::plans::list_plans,
        crate::handlers::plans::get_limit,
        crate::handlers::plans::get_feature,
        crate::handlers::proposals::create_proposal,
        crate::handlers::proposals::list_proposals,
        crate::handlers::proposals::delete_proposal,
        crate::handlers::proposals::add_tier,
        crate::handlers::proposals::add_benefit,
        crate::handlers::domains::bind_subdomain,
        crate::handlers::domains::clear_subdomain,
        crate::handlers::domains::bind_custom_domain,
        crate::handlers::domains::clear_custom_domain,
        crate::handlers::domains::update_custom_domain_status,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::PublicPageResponse,
            crate::handlers::HealthResponse,
            crate::repositories::PublicProposal,
            crate::repositories::PublicTier,
            crate::handlers::tenants::CreateTenantRequest,
            crate::handlers::tenants::TenantResponse,
            crate::handlers::tenants::AnalyticsResponse,
            crate::handlers::plans::PlansResponse,
            crate::handlers::plans::LimitStatusResponse,
            crate::handlers::plans::FeatureAccessResponse,
            crate::handlers::proposals::CreateProposalRequest,
            crate::handlers::proposals::ProposalResponse,
            crate::handlers::proposals::ProposalsResponse,
            crate::handlers::proposals::CreateTierRequest,
            crate::handlers::proposals::TierResponse,
            crate::handlers::proposals::CreateBenefitRequest,
            crate::handlers::proposals::BenefitResponse,
            crate::handlers::domains::BindSubdomainRequest,
            crate::handlers::domains::BindCustomDomainRequest,
            crate::handlers::domains::UpdateDomainStatusRequest,
            crate::plans::PlanTier,
            crate::plans::PlanLimits,
            crate::plans::ResourceKind,
            crate::plans::Feature,
            crate::plans::LimitCheckResult,
            crate::domains::DomainStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "public", description = "Host-routed public site"),
        (name = "tenants", description = "Tenant management"),
        (name = "plans", description = "Plan limits and feature access"),
        (name = "proposals", description = "Sponsorship proposals"),
        (name = "domains", description = "Subdomain and custom-domain bindings"),
    ),
    info(
        title = "Sponsorship Proposals API",
        description = "Multi-tenant sponsorship proposal hosting",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
