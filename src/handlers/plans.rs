//! # Plans API Handlers
//!
//! Read-only views of the plan table and of the current tenant's standing
//! against it.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{CurrentTenant, OperatorAuth, TenantHeader};
use crate::error::ApiError;
use crate::plans::{LimitCheckResult, PlanLimits, PlanTier, ResourceKind};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlansResponse {
    pub plans: Vec<PlanLimits>,
}

/// Usage of one resource against the tenant's plan
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LimitStatusResponse {
    pub resource: ResourceKind,
    pub tier: PlanTier,
    #[serde(flatten)]
    pub result: LimitCheckResult,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeatureAccessResponse {
    #[schema(example = "analytics")]
    pub feature: String,
    pub tier: PlanTier,
    pub enabled: bool,
}

/// List every plan with its limits and features
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Plan table; `-1` means unlimited", body = PlansResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "plans"
)]
pub async fn list_plans(State(state): State<AppState>, _operator: OperatorAuth) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: state.plan_gate.evaluator().table().rows().to_vec(),
    })
}

/// Current usage of a resource against the tenant's plan limit
#[utoipa::path(
    get,
    path = "/api/v1/limits/{resource}",
    security(("bearer_auth" = [])),
    params(
        TenantHeader,
        ("resource" = String, Path, description = "proposals, apiKeys, customDomains or teamMembers")
    ),
    responses(
        (status = 200, description = "Limit check result", body = LimitStatusResponse),
        (status = 400, description = "Unknown resource kind", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "plans"
)]
pub async fn get_limit(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(resource): Path<String>,
) -> Result<Json<LimitStatusResponse>, ApiError> {
    let (resource, result) = state
        .plan_gate
        .check_key(tenant.id, tenant.plan_tier, &resource)
        .await?;

    Ok(Json(LimitStatusResponse {
        resource,
        tier: tenant.plan_tier,
        result,
    }))
}

/// Whether the tenant's plan includes a feature
#[utoipa::path(
    get,
    path = "/api/v1/features/{feature}",
    security(("bearer_auth" = [])),
    params(
        TenantHeader,
        ("feature" = String, Path, description = "removeBranding, analytics, prioritySupport, customTemplates or apiAccess")
    ),
    responses(
        (status = 200, description = "Feature access", body = FeatureAccessResponse),
        (status = 400, description = "Not a boolean plan feature", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "plans"
)]
pub async fn get_feature(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(feature): Path<String>,
) -> Result<Json<FeatureAccessResponse>, ApiError> {
    let enabled = state
        .plan_gate
        .evaluator()
        .has_feature_access_key(tenant.plan_tier, &feature)?;

    Ok(Json(FeatureAccessResponse {
        feature,
        tier: tenant.plan_tier,
        enabled,
    }))
}
