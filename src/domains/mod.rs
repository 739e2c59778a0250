//! # Domain Resolution
//!
//! Classifies inbound `Host` values into the primary app domain, a reserved
//! operational subdomain, a tenant subdomain, or a candidate custom domain.
//!
//! Resolution is ordered and first match wins:
//!
//! 1. normalize (lowercase, strip port and trailing dot); malformed → `NoMatch`
//! 2. `<label>.localhost` with a non-reserved label → `Subdomain`
//! 3. exact primary hosts (`localhost`, `127.0.0.1`, base, `www.`/`app.` base) → `Primary`
//! 4. `<label>.<base>` with a non-reserved label → `Subdomain`
//! 5. reserved label on either pattern → `Reserved`
//! 6. anything else that is a valid hostname → `CustomDomain`

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub mod cached;
pub mod lookup;
pub mod status;

pub use cached::CachedTenantLookup;
pub use lookup::{HostResolution, TenantLookup, TenantResolver};
pub use status::DomainStatus;

/// Labels tenants may never claim as a subdomain.
pub const RESERVED_SUBDOMAINS: [&str; 5] = ["www", "app", "api", "admin", "mail"];

const MAX_LABEL_LEN: usize = 63;
const MAX_HOSTNAME_LEN: usize = 253;

/// Returns true when `label` is one of [`RESERVED_SUBDOMAINS`].
pub fn is_reserved(label: &str) -> bool {
    RESERVED_SUBDOMAINS.contains(&label)
}

/// Classification of an inbound hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DomainMatch {
    Primary,
    Reserved,
    Subdomain(String),
    CustomDomain(String),
    NoMatch,
}

impl DomainMatch {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainMatch::Primary => "primary",
            DomainMatch::Reserved => "reserved",
            DomainMatch::Subdomain(_) => "subdomain",
            DomainMatch::CustomDomain(_) => "custom_domain",
            DomainMatch::NoMatch => "no_match",
        }
    }
}

/// Errors raised when validating hosting identities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid base domain '{0}'")]
    InvalidBaseDomain(String),
    #[error("invalid subdomain '{value}': {reason}")]
    InvalidSubdomain { value: String, reason: &'static str },
    #[error("subdomain '{0}' is reserved")]
    ReservedSubdomain(String),
    #[error("invalid custom domain '{value}': {reason}")]
    InvalidCustomDomain { value: String, reason: &'static str },
    #[error("domain status cannot move from {from} to {to}")]
    InvalidTransition {
        from: DomainStatus,
        to: DomainStatus,
    },
}

/// Stateless hostname classifier for one platform base domain.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    base_domain: String,
    primary_hosts: [String; 5],
    localhost_pattern: Regex,
    base_pattern: Regex,
}

impl DomainResolver {
    /// Builds a resolver for `base_domain` (e.g. `example.com`).
    pub fn new(base_domain: &str) -> Result<Self, DomainError> {
        let base_domain = normalize_host(base_domain)
            .filter(|host| host.len() <= MAX_HOSTNAME_LEN && has_valid_labels(host))
            .ok_or_else(|| DomainError::InvalidBaseDomain(base_domain.to_string()))?;

        let base_pattern = Regex::new(&format!(
            r"^([a-z0-9-]+)\.{}$",
            regex::escape(&base_domain)
        ))
        .map_err(|_| DomainError::InvalidBaseDomain(base_domain.clone()))?;
        let localhost_pattern = Regex::new(r"^([a-z0-9-]+)\.localhost$")
            .map_err(|_| DomainError::InvalidBaseDomain(base_domain.clone()))?;

        Ok(Self {
            primary_hosts: [
                "localhost".to_string(),
                "127.0.0.1".to_string(),
                base_domain.clone(),
                format!("www.{base_domain}"),
                format!("app.{base_domain}"),
            ],
            base_domain,
            localhost_pattern,
            base_pattern,
        })
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Classifies `hostname`. Never fails; malformed input yields `NoMatch`.
    pub fn resolve(&self, hostname: &str) -> DomainMatch {
        let Some(host) = normalize_host(hostname) else {
            return DomainMatch::NoMatch;
        };

        let mut reserved_hit = false;

        if let Some(label) = capture_label(&self.localhost_pattern, &host) {
            if !is_reserved(label) {
                return DomainMatch::Subdomain(label.to_string());
            }
            reserved_hit = true;
        }

        if self.primary_hosts.iter().any(|primary| *primary == host) {
            return DomainMatch::Primary;
        }

        if let Some(label) = capture_label(&self.base_pattern, &host) {
            if !is_reserved(label) {
                return DomainMatch::Subdomain(label.to_string());
            }
            reserved_hit = true;
        }

        if reserved_hit {
            return DomainMatch::Reserved;
        }

        if is_valid_hostname(&host) {
            DomainMatch::CustomDomain(host)
        } else {
            DomainMatch::NoMatch
        }
    }

    /// Validates a custom domain a tenant wants to bind, returning it normalized.
    pub fn validate_custom_domain(&self, hostname: &str) -> Result<String, DomainError> {
        let invalid = |reason| DomainError::InvalidCustomDomain {
            value: hostname.to_string(),
            reason,
        };

        let host = normalize_host(hostname).ok_or_else(|| invalid("contains invalid characters"))?;
        if hostname.contains(':') {
            return Err(invalid("must not include a port"));
        }
        if !is_valid_hostname(&host) {
            return Err(invalid("is not a valid hostname"));
        }
        if host == "localhost" || host.ends_with(".localhost") {
            return Err(invalid("cannot be a localhost name"));
        }
        if host == self.base_domain || host.ends_with(&format!(".{}", self.base_domain)) {
            return Err(invalid("cannot be the platform domain or one of its subdomains"));
        }
        if host
            .rsplit('.')
            .next()
            .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid("cannot be an IP address"));
        }
        if !matches!(self.resolve(&host), DomainMatch::CustomDomain(_)) {
            return Err(invalid("is served by the platform"));
        }

        Ok(host)
    }
}

/// Validates a subdomain a tenant wants to claim, returning it normalized.
pub fn validate_subdomain(name: &str) -> Result<String, DomainError> {
    let invalid = |reason| DomainError::InvalidSubdomain {
        value: name.to_string(),
        reason,
    };

    let label = name.trim().to_ascii_lowercase();
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return Err(invalid("must be between 1 and 63 characters"));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("may only contain letters, digits, and hyphens"));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(invalid("cannot start or end with a hyphen"));
    }
    if is_reserved(&label) {
        return Err(DomainError::ReservedSubdomain(label));
    }

    Ok(label)
}

/// Lowercases, strips any `:port` suffix and one trailing dot. Returns `None`
/// for empty input or characters outside `[a-z0-9.-]`.
fn normalize_host(raw: &str) -> Option<String> {
    let host = raw.split(':').next().unwrap_or_default().trim();
    let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();

    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return None;
    }

    Some(host)
}

fn capture_label<'h>(pattern: &Regex, host: &'h str) -> Option<&'h str> {
    pattern
        .captures(host)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// At least two labels, at most 253 characters overall.
fn is_valid_hostname(host: &str) -> bool {
    host.len() <= MAX_HOSTNAME_LEN && host.contains('.') && has_valid_labels(host)
}

/// Every dot-separated label is 1..=63 characters and does not start or end
/// with a hyphen.
fn has_valid_labels(host: &str) -> bool {
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}
