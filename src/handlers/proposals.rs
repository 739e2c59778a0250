//! # Proposals API Handlers
//!
//! Proposal, tier and benefit management. Creating a proposal is gated by
//! the tenant's `proposals` limit.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentTenant, TenantHeader};
use crate::error::{ApiError, ErrorType, validation_error};
use crate::models::{proposal, proposal_tier, tier_benefit};
use crate::plans::ResourceKind;
use crate::server::AppState;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateProposalRequest {
    #[schema(example = "DevConf 2026 Sponsorship")]
    pub title: String,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub created_at: String,
}

impl From<proposal::Model> for ProposalResponse {
    fn from(model: proposal::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            summary: model.summary,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProposalsResponse {
    pub proposals: Vec<ProposalResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTierRequest {
    #[schema(example = "Gold")]
    pub name: String,
    /// Price in the smallest currency unit
    #[schema(example = 500000)]
    pub price_cents: Option<i64>,
    /// Display position; appended after existing tiers when omitted
    pub position: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TierResponse {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub name: String,
    pub price_cents: Option<i64>,
    pub position: i32,
}

impl From<proposal_tier::Model> for TierResponse {
    fn from(model: proposal_tier::Model) -> Self {
        Self {
            id: model.id,
            proposal_id: model.proposal_id,
            name: model.name,
            price_cents: model.price_cents,
            position: model.position,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBenefitRequest {
    #[schema(example = "Logo on the main stage screen")]
    pub description: String,
    pub position: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BenefitResponse {
    pub id: Uuid,
    pub tier_id: Uuid,
    pub description: String,
    pub position: i32,
}

impl From<tier_benefit::Model> for BenefitResponse {
    fn from(model: tier_benefit::Model) -> Self {
        Self {
            id: model.id,
            tier_id: model.tier_id,
            description: model.description,
            position: model.position,
        }
    }
}

fn required_text(field: &'static str, value: &str, max_len: usize) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(validation_error(
            &format!("{field} is required"),
            json!({ "field": field }),
        ));
    }
    if value.chars().count() > max_len {
        return Err(validation_error(
            &format!("{field} exceeds maximum length"),
            json!({ "field": field, "max_length": max_len }),
        ));
    }
    Ok(value.to_string())
}

fn non_negative_price(price_cents: Option<i64>) -> Result<Option<i64>, ApiError> {
    match price_cents {
        Some(price) if price < 0 => Err(validation_error(
            "price_cents must not be negative",
            json!({ "field": "price_cents" }),
        )),
        other => Ok(other),
    }
}

/// Create a proposal, subject to the plan's proposal limit
#[utoipa::path(
    post,
    path = "/api/v1/proposals",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = CreateProposalRequest,
    responses(
        (status = 201, description = "Proposal created", body = ProposalResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Plan limit reached", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "proposals"
)]
pub async fn create_proposal(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Json(request): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<ProposalResponse>), ApiError> {
    let title = required_text("title", &request.title, MAX_TITLE_LEN)?;
    let summary = request
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    state
        .plan_gate
        .ensure_allowed(tenant.id, tenant.plan_tier, ResourceKind::Proposals)
        .await?;

    let proposal = state.proposals.create(tenant.id, title, summary).await?;
    tracing::info!(tenant_id = %tenant.id, proposal_id = %proposal.id, "Created proposal");

    Ok((StatusCode::CREATED, Json(proposal.into())))
}

/// List the tenant's proposals
#[utoipa::path(
    get,
    path = "/api/v1/proposals",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    responses(
        (status = 200, description = "Proposals, oldest first", body = ProposalsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "proposals"
)]
pub async fn list_proposals(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<ProposalsResponse>, ApiError> {
    let proposals = state.proposals.list_for_tenant(tenant.id).await?;
    Ok(Json(ProposalsResponse {
        proposals: proposals.into_iter().map(Into::into).collect(),
    }))
}

/// Delete a proposal with its tiers and benefits. Deleting the tenant's last
/// proposal also releases its subdomain and custom domain.
#[utoipa::path(
    delete,
    path = "/api/v1/proposals/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 204, description = "Proposal deleted; domain bindings released if it was the last one"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Proposal not found", body = ApiError)
    ),
    tag = "proposals"
)]
pub async fn delete_proposal(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.proposals.delete(tenant.id, id).await? {
        return Err(ErrorType::NotFound.into());
    }

    // Nothing left to host once the last proposal is gone.
    if state.proposals.count_for_tenant(tenant.id).await? == 0 {
        state.tenants.release_domains(tenant.id).await?;
        state.host_cache.invalidate_tenant(tenant.id).await;
        tracing::info!(tenant_id = %tenant.id, "Released domain bindings after last proposal was deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Add a sponsorship tier to a proposal
#[utoipa::path(
    post,
    path = "/api/v1/proposals/{id}/tiers",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Proposal ID")),
    request_body = CreateTierRequest,
    responses(
        (status = 201, description = "Tier created", body = TierResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Proposal not found", body = ApiError)
    ),
    tag = "proposals"
)]
pub async fn add_tier(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<CreateTierRequest>,
) -> Result<(StatusCode, Json<TierResponse>), ApiError> {
    let name = required_text("name", &request.name, MAX_TITLE_LEN)?;
    let price_cents = non_negative_price(request.price_cents)?;

    let tier = state
        .proposals
        .add_tier(tenant.id, proposal_id, name, price_cents, request.position)
        .await?;

    Ok((StatusCode::CREATED, Json(tier.into())))
}

/// Add a benefit line to a tier
#[utoipa::path(
    post,
    path = "/api/v1/tiers/{id}/benefits",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Tier ID")),
    request_body = CreateBenefitRequest,
    responses(
        (status = 201, description = "Benefit created", body = BenefitResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Tier not found", body = ApiError)
    ),
    tag = "proposals"
)]
pub async fn add_benefit(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(tier_id): Path<Uuid>,
    Json(request): Json<CreateBenefitRequest>,
) -> Result<(StatusCode, Json<BenefitResponse>), ApiError> {
    let description = required_text("description", &request.description, 500)?;

    let benefit = state
        .proposals
        .add_benefit(tenant.id, tier_id, description, request.position)
        .await?;

    Ok((StatusCode::CREATED, Json(benefit.into())))
}
