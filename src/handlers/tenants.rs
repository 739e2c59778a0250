//! # Tenants API Handlers
//!
//! Tenant creation and lookup for operators, plus per-tenant analytics.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentTenant, OperatorAuth, TenantHeader};
use crate::domains::{DomainStatus, validate_subdomain};
use crate::error::{ApiError, ErrorType, validation_error};
use crate::models::tenant::Model as TenantModel;
use crate::plans::{Feature, PlanTier};
use crate::server::AppState;

const MAX_NAME_LEN: usize = 255;

/// Request payload for creating a new tenant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTenantRequest {
    /// Display name (max 255 characters)
    #[schema(example = "Tech Talks Conference")]
    pub name: Option<String>,
    /// Plan tier, `free` when omitted
    pub plan_tier: Option<PlanTier>,
    /// Subdomain to bind right away
    #[schema(example = "techtalks")]
    pub subdomain: Option<String>,
}

/// Tenant as seen by operators
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub plan_tier: PlanTier,
    pub subdomain: Option<String>,
    /// Full hostname served by the subdomain binding
    #[schema(example = "techtalks.example.com")]
    pub subdomain_host: Option<String>,
    pub custom_domain: Option<String>,
    pub domain_status: Option<DomainStatus>,
    pub view_count: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl TenantResponse {
    pub fn from_model(tenant: TenantModel, base_domain: &str) -> Self {
        Self {
            subdomain_host: tenant
                .subdomain
                .as_ref()
                .map(|label| format!("{label}.{base_domain}")),
            id: tenant.id,
            name: tenant.name,
            plan_tier: tenant.plan_tier,
            subdomain: tenant.subdomain,
            custom_domain: tenant.custom_domain,
            domain_status: tenant.domain_status,
            view_count: tenant.view_count,
            created_at: tenant.created_at.to_rfc3339(),
        }
    }
}

fn validate_name(name: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(name) = name.map(|n| n.trim().to_string()) else {
        return Ok(None);
    };
    if name.is_empty() {
        return Ok(None);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(validation_error(
            "Tenant name exceeds maximum length",
            json!({ "field": "name", "max_length": MAX_NAME_LEN }),
        ));
    }
    Ok(Some(name))
}

/// Create a new tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    security(("bearer_auth" = [])),
    request_body = CreateTenantRequest,
    responses(
        (status = 201, description = "Tenant created", body = TenantResponse, headers(
            ("Location", description = "URL of the created tenant"),
            ("X-Trace-Id", description = "Trace identifier for request correlation")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "Subdomain already taken", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Json(request): Json<CreateTenantRequest>,
) -> Result<(StatusCode, [(axum::http::HeaderName, String); 1], Json<TenantResponse>), ApiError>
{
    let name = validate_name(request.name)?;
    let subdomain = request.subdomain.as_deref().map(validate_subdomain).transpose()?;

    if let Some(label) = &subdomain
        && state.tenants.find_by_subdomain(label).await?.is_some()
    {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Subdomain '{label}' is already taken"),
        ));
    }

    let mut tenant = state
        .tenants
        .create(name, request.plan_tier.unwrap_or_default())
        .await?;

    if let Some(label) = subdomain {
        tenant = state.tenants.bind_subdomain(tenant.id, &label).await?;
        state.host_cache.invalidate_tenant(tenant.id).await;
    }

    let location = format!("/api/v1/tenants/{}", tenant.id);
    let base_domain = state.resolver.domain_resolver().base_domain();
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(TenantResponse::from_model(tenant, base_domain)),
    ))
}

/// Fetch a tenant by ID
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = TenantResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantResponse>, ApiError> {
    let tenant = state
        .tenants
        .get(id)
        .await?
        .ok_or_else(|| ApiError::from(ErrorType::NotFound))?;

    Ok(Json(TenantResponse::from_model(
        tenant,
        state.resolver.domain_resolver().base_domain(),
    )))
}

/// Public page statistics for the current tenant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub tenant_id: Uuid,
    pub view_count: i64,
    pub proposals: u64,
}

/// Page views and proposal count; requires the `analytics` plan feature
#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    responses(
        (status = 200, description = "Tenant analytics", body = AnalyticsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Plan does not include analytics", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_analytics(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    state
        .plan_gate
        .ensure_feature(tenant.plan_tier, Feature::Analytics)?;

    Ok(Json(AnalyticsResponse {
        tenant_id: tenant.id,
        view_count: tenant.view_count,
        proposals: state.proposals.count_for_tenant(tenant.id).await?,
    }))
}
