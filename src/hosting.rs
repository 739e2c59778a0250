//! Host-based routing for the public site.
//!
//! Every public request is resolved from its `Host` to a [`HostResolution`]
//! before handlers run. Handlers read the outcome through [`HostContext`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::HOST, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::domains::HostResolution;
use crate::error::ApiError;
use crate::server::AppState;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Resolution of the request's hostname
#[derive(Debug, Clone)]
pub struct HostContext {
    pub host: String,
    pub resolution: HostResolution,
}

/// Hostname the client asked for. A proxy-supplied `X-Forwarded-Host` wins
/// over `Host`; only its first entry is used.
pub fn request_host(headers: &HeaderMap) -> Option<&str> {
    let forwarded = headers
        .get(FORWARDED_HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    forwarded.or_else(|| {
        headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

pub async fn host_routing_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let host = request_host(request.headers())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    let resolution = state.resolver.resolve(&host).await?;
    tracing::debug!(host = %host, kind = resolution.kind(), "Resolved request host");

    request
        .extensions_mut()
        .insert(HostContext { host, resolution });
    Ok(next.run(request).await)
}

impl<S: Sync> FromRequestParts<S> for HostContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<HostContext>().cloned().ok_or_else(|| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Host routing is not configured for this route",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_host_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("10.0.0.5:8080"));
        headers.insert(
            FORWARDED_HOST,
            HeaderValue::from_static("techtalks.example.com, proxy.internal"),
        );
        assert_eq!(request_host(&headers), Some("techtalks.example.com"));
    }

    #[test]
    fn falls_back_to_host_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_host(&headers), None);

        headers.insert(HOST, HeaderValue::from_static("app.example.com"));
        headers.insert(FORWARDED_HOST, HeaderValue::from_static(" "));
        assert_eq!(request_host(&headers), Some("app.example.com"));
    }
}
