//! # Domains API Handlers
//!
//! Subdomain and custom-domain bindings for the current tenant. Every change
//! drops the tenant's cached host lookups.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tenants::TenantResponse;
use crate::auth::{CurrentTenant, TenantHeader};
use crate::domains::DomainStatus;
use crate::error::ApiError;
use crate::models::tenant::Model as TenantModel;
use crate::plans::ResourceKind;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BindSubdomainRequest {
    #[schema(example = "techtalks")]
    pub subdomain: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BindCustomDomainRequest {
    #[schema(example = "sponsors.techtalks.io")]
    pub hostname: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateDomainStatusRequest {
    pub status: DomainStatus,
}

async fn respond(state: &AppState, tenant: TenantModel) -> Json<TenantResponse> {
    state.host_cache.invalidate_tenant(tenant.id).await;
    Json(TenantResponse::from_model(
        tenant,
        state.resolver.domain_resolver().base_domain(),
    ))
}

/// Bind or replace the tenant's subdomain
#[utoipa::path(
    put,
    path = "/api/v1/domains/subdomain",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = BindSubdomainRequest,
    responses(
        (status = 200, description = "Subdomain bound", body = TenantResponse),
        (status = 400, description = "Invalid or reserved subdomain", body = ApiError),
        (status = 409, description = "Subdomain already taken", body = ApiError)
    ),
    tag = "domains"
)]
pub async fn bind_subdomain(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Json(request): Json<BindSubdomainRequest>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state
        .tenants
        .bind_subdomain(tenant.id, &request.subdomain)
        .await?;
    Ok(respond(&state, tenant).await)
}

/// Remove the tenant's subdomain
#[utoipa::path(
    delete,
    path = "/api/v1/domains/subdomain",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    responses(
        (status = 200, description = "Subdomain removed", body = TenantResponse)
    ),
    tag = "domains"
)]
pub async fn clear_subdomain(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state.tenants.clear_subdomain(tenant.id).await?;
    Ok(respond(&state, tenant).await)
}

/// Bind or replace the tenant's custom domain; verification restarts at `pending`
#[utoipa::path(
    put,
    path = "/api/v1/domains/custom",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = BindCustomDomainRequest,
    responses(
        (status = 200, description = "Custom domain bound", body = TenantResponse),
        (status = 400, description = "Invalid hostname", body = ApiError),
        (status = 403, description = "Plan does not allow custom domains", body = ApiError),
        (status = 409, description = "Hostname bound to another tenant", body = ApiError)
    ),
    tag = "domains"
)]
pub async fn bind_custom_domain(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Json(request): Json<BindCustomDomainRequest>,
) -> Result<Json<TenantResponse>, ApiError> {
    // Replacing an existing binding does not consume another slot.
    if tenant.custom_domain.is_none() {
        state
            .plan_gate
            .ensure_allowed(tenant.id, tenant.plan_tier, ResourceKind::CustomDomains)
            .await?;
    }

    let tenant = state
        .tenants
        .bind_custom_domain(tenant.id, state.resolver.domain_resolver(), &request.hostname)
        .await?;
    Ok(respond(&state, tenant).await)
}

/// Remove the tenant's custom domain
#[utoipa::path(
    delete,
    path = "/api/v1/domains/custom",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    responses(
        (status = 200, description = "Custom domain removed", body = TenantResponse)
    ),
    tag = "domains"
)]
pub async fn clear_custom_domain(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state.tenants.clear_custom_domain(tenant.id).await?;
    Ok(respond(&state, tenant).await)
}

/// Advance custom-domain verification
#[utoipa::path(
    put,
    path = "/api/v1/domains/custom/status",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = UpdateDomainStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = TenantResponse),
        (status = 404, description = "No custom domain bound", body = ApiError),
        (status = 409, description = "Transition not allowed", body = ApiError)
    ),
    tag = "domains"
)]
pub async fn update_custom_domain_status(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Json(request): Json<UpdateDomainStatusRequest>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state
        .tenants
        .update_domain_status(tenant.id, request.status)
        .await?;
    Ok(respond(&state, tenant).await)
}
