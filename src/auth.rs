//! # Authentication and Tenant Scoping
//!
//! Operator bearer authentication for the management API, and the
//! [`CurrentTenant`] extractor that loads the tenant named by `X-Tenant-Id`.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, ErrorType, unauthorized, unauthorized_with_trace_id, validation_error};
use crate::models::tenant::Model as TenantModel;
use crate::server::AppState;
use crate::telemetry::TraceContext;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Marker inserted into request extensions once the operator token checks out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorAuth;

/// The tenant addressed by the request's `X-Tenant-Id` header
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub TenantModel);

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Rejects requests without a valid operator bearer token.
pub async fn operator_auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = request
        .extensions()
        .get::<TraceContext>()
        .map(|ctx| ctx.trace_id.clone());

    let token = bearer_token(request.headers()).map_err(|message| match &trace_id {
        Some(trace_id) => unauthorized_with_trace_id(Some(message), trace_id.clone()),
        None => unauthorized(Some(message)),
    })?;

    if !token_is_valid(&config, token) {
        tracing::warn!("Rejected operator request with unknown bearer token");
        return Err(unauthorized(Some("Invalid bearer token")));
    }

    request.extensions_mut().insert(OperatorAuth);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header")?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or("Authorization header must use Bearer scheme")
}

fn token_is_valid(config: &AppConfig, token: &str) -> bool {
    config
        .operator_tokens
        .iter()
        .any(|configured| bool::from(token.as_bytes().ct_eq(configured.as_bytes())))
}

/// Parses the `X-Tenant-Id` header.
pub fn tenant_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(TENANT_HEADER)
        .ok_or_else(|| {
            validation_error(
                "Missing required header",
                json!({ "X-Tenant-Id": "Required header is missing" }),
            )
        })?
        .to_str()
        .map_err(|_| {
            validation_error(
                "Invalid tenant header",
                json!({ "X-Tenant-Id": "Header must be valid UTF-8" }),
            )
        })?;

    value.trim().parse::<Uuid>().map_err(|_| {
        validation_error(
            "Invalid tenant ID",
            json!({ "X-Tenant-Id": "Must be a valid UUID" }),
        )
    })
}

/// OpenAPI header parameter for X-Tenant-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct TenantHeader {
    /// Tenant identifier (UUID) that scopes the request to a specific tenant
    #[serde(rename = "X-Tenant-Id")]
    #[param(rename = "X-Tenant-Id", value_type = String)]
    pub tenant_id: String,
}

impl FromRequestParts<AppState> for OperatorAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorAuth>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Operator authentication required")))
    }
}

impl FromRequestParts<AppState> for CurrentTenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        OperatorAuth::from_request_parts(parts, state).await?;

        let tenant_id = tenant_id_from_headers(&parts.headers)?;
        let tenant = state.tenants.get(tenant_id).await?.ok_or_else(|| {
            ApiError::from(ErrorType::NotFound).with_details(json!({ "tenant_id": tenant_id }))
        })?;

        Ok(CurrentTenant(tenant))
    }
}
