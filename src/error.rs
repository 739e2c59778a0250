//! # Error Handling
//!
//! Unified error handling for the proposals API: every failure becomes a
//! problem+json response carrying the request's trace ID.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domains::DomainError;
use crate::plans::{LimitCheckResult, LimitError, ResourceKind};
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // Fallback: generate a correlation ID for basic client-server log correlation
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Too Many Requests")]
    TooManyRequests,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error type (SCREAMING_SNAKE_CASE)
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::TooManyRequests => "RATE_LIMITED",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorType::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        // Add Retry-After header if present
        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            error_type.to_string(),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // Log the full error for debugging
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Query(query_err) => {
                tracing::error!("Database query error: {:?}", query_err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
            sea_orm::DbErr::Exec(exec_err) => {
                tracing::error!("Database execution error: {:?}", exec_err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create an unauthorized error (401) with explicit trace_id
pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    let mut error = ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

/// Create a forbidden error (403)
pub fn forbidden(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Insufficient permissions");
    ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}


impl From<LimitError> for ApiError {
    fn from(error: LimitError) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            error.to_string(),
        )
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match &error {
            DomainError::InvalidTransition { from, to } => {
                Self::new(StatusCode::CONFLICT, "INVALID_TRANSITION", error.to_string())
                    .with_details(json!({ "from": from, "to": to }))
            }
            DomainError::ReservedSubdomain(name) => {
                Self::new(StatusCode::BAD_REQUEST, "RESERVED_SUBDOMAIN", error.to_string())
                    .with_details(json!({ "subdomain": name }))
            }
            _ => Self::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                error.to_string(),
            ),
        }
    }
}

/// Create a plan limit error (403) from a denied check.
pub fn plan_limit_exceeded(resource: ResourceKind, result: &LimitCheckResult) -> ApiError {
    let message = result
        .message
        .clone()
        .unwrap_or_else(|| format!("Plan limit reached for {}", resource.label()));

    ApiError::new(StatusCode::FORBIDDEN, "PLAN_LIMIT_EXCEEDED", message).with_details(json!({
        "resource": resource,
        "current": result.current,
        "limit": result.limit,
        "remaining": result.remaining,
    }))
}

/// Create a feature gating error (403).
pub fn feature_not_available(feature: &str, tier: &str) -> ApiError {
    ApiError::new(
        StatusCode::FORBIDDEN,
        "FEATURE_NOT_AVAILABLE",
        format!("The {feature} feature is not available on the {tier} plan"),
    )
    .with_details(json!({ "feature": feature, "tier": tier }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::DomainStatus;
    use crate::plans::{LimitEvaluator, PlanTier};

    async fn body_json(error: ApiError) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_problem_json() {
        let error = ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Tenant not found");
        let (status, headers, body) = body_json(error).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers["content-type"], "application/problem+json");
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "Tenant not found");
        assert!(body["trace_id"].as_str().unwrap().starts_with("corr-"));
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn retry_after_sets_header() {
        let error = ApiError::from(ErrorType::ServiceUnavailable).with_retry_after(30);
        let (status, headers, body) = body_json(error).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(headers["retry-after"], "30");
        assert_eq!(body["retry_after"], 30);
    }

    #[tokio::test]
    async fn trace_id_comes_from_request_scope() {
        let context = telemetry::TraceContext {
            trace_id: "req-42".to_string(),
        };
        let error = telemetry::with_trace_context(context, async {
            ApiError::from(ErrorType::NotFound)
        })
        .await;

        assert_eq!(error.trace_id.as_deref(), Some("req-42"));
    }

    #[tokio::test]
    async fn plan_limit_exceeded_carries_check_result() {
        let result = LimitEvaluator::default().evaluate(PlanTier::Free, ResourceKind::Proposals, 1);
        let (status, _, body) = body_json(plan_limit_exceeded(ResourceKind::Proposals, &result)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PLAN_LIMIT_EXCEEDED");
        assert_eq!(body["details"]["resource"], "proposals");
        assert_eq!(body["details"]["current"], 1);
        assert_eq!(body["details"]["limit"], 1);
        assert_eq!(body["details"]["remaining"], 0);
        assert!(body["message"].as_str().unwrap().contains("Free plan"));
    }

    #[tokio::test]
    async fn limit_errors_are_validation_failures() {
        let error = ApiError::from(LimitError::UnknownResourceKind("widgets".to_string()));
        let (status, _, body) = body_json(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[test]
    fn domain_errors_map_to_status_codes() {
        let transition = ApiError::from(DomainError::InvalidTransition {
            from: DomainStatus::Verified,
            to: DomainStatus::Pending,
        });
        assert_eq!(transition.status, StatusCode::CONFLICT);
        assert_eq!(&*transition.code, "INVALID_TRANSITION");

        let reserved = ApiError::from(DomainError::ReservedSubdomain("admin".to_string()));
        assert_eq!(reserved.status, StatusCode::BAD_REQUEST);
        assert_eq!(&*reserved.code, "RESERVED_SUBDOMAIN");

        let invalid = ApiError::from(DomainError::InvalidSubdomain {
            value: "-bad".to_string(),
            reason: "must not start or end with a hyphen",
        });
        assert_eq!(&*invalid.code, "VALIDATION_FAILED");
    }

    #[test]
    fn record_not_found_maps_to_404() {
        let error = ApiError::from(sea_orm::DbErr::RecordNotFound("tenant".to_string()));
        assert_eq!(error.status, StatusCode::NOT_FOUND);
    }
}
