//! # API Handlers
//!
//! Public site handlers live here; the operator API is split by resource.

use axum::{
    extract::State,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db;
use crate::domains::HostResolution;
use crate::error::{ApiError, ErrorType};
use crate::hosting::HostContext;
use crate::models::ServiceInfo;
use crate::plans::{Feature, PlanTier};
use crate::repositories::PublicProposal;
use crate::server::AppState;

pub mod domains;
pub mod plans;
pub mod proposals;
pub mod tenants;

/// A tenant's public proposal page
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicPageResponse {
    pub tenant_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub plan_tier: PlanTier,
    /// How the host matched: `subdomain` or `custom_domain`
    #[schema(example = "subdomain")]
    pub matched_by: String,
    /// False once the plan unlocks `removeBranding`
    pub show_branding: bool,
    pub proposals: Vec<PublicProposal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Root handler: service info on platform hosts, the tenant's public page on
/// tenant hosts, and a redirect to the platform for anything else.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information or a tenant's public page", body = PublicPageResponse),
        (status = 307, description = "Unknown host, redirected to the platform"),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "public"
)]
pub async fn root(
    State(state): State<AppState>,
    HostContext { resolution, .. }: HostContext,
) -> Result<Response, ApiError> {
    match resolution {
        HostResolution::Primary | HostResolution::Reserved => {
            Ok(Json(ServiceInfo::default()).into_response())
        }
        HostResolution::Tenant { tenant, matched } => {
            state.tenants.increment_view_count(tenant.id).await?;
            let proposals = state.proposals.load_public_page(tenant.id).await?;
            let show_branding = !state
                .plan_gate
                .evaluator()
                .has_feature_access(tenant.plan_tier, Feature::RemoveBranding);

            Ok(Json(PublicPageResponse {
                tenant_id: tenant.id,
                name: tenant.name,
                plan_tier: tenant.plan_tier,
                matched_by: matched.kind().to_string(),
                show_branding,
                proposals,
            })
            .into_response())
        }
        HostResolution::NoMatch => {
            let target = format!(
                "https://{}/",
                state.resolver.domain_resolver().base_domain()
            );
            Ok(Redirect::temporary(&target).into_response())
        }
    }
}

/// Liveness plus database reachability
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "public"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "Health check failed");
        ApiError::from(ErrorType::ServiceUnavailable)
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

#[cfg(test)]
mod tests;
