//! Configuration loading for the proposals service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `PROPOSALS_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domains::{DomainError, DomainResolver};
use crate::plans::{PlanLimitsTable, PlanTableError};

const ENV_PREFIX: &str = "PROPOSALS_";

/// Application configuration derived from `PROPOSALS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_tokens: Vec<String>,
    #[serde(default = "default_base_domain")]
    pub base_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_limits_path: Option<PathBuf>,
    #[serde(default)]
    pub domain_cache: DomainCacheConfig,
}

/// Host → tenant lookup cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DomainCacheConfig {
    #[serde(default = "default_domain_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_domain_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for DomainCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_domain_cache_capacity(),
            ttl_seconds: default_domain_cache_ttl_seconds(),
        }
    }
}

impl DomainCacheConfig {
    /// Validate cache bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidDomainCacheCapacity {
                value: self.capacity,
            });
        }
        if self.ttl_seconds == 0 || self.ttl_seconds > 86_400 {
            return Err(ConfigError::InvalidDomainCacheTtl {
                value: self.ttl_seconds,
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            operator_tokens: Vec::new(),
            base_domain: default_base_domain(),
            plan_limits_path: None,
            domain_cache: DomainCacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.operator_tokens.is_empty() {
            config.operator_tokens = vec!["[REDACTED]".to_string()];
        }
        if config.database_url.contains('@') {
            config.database_url = "[REDACTED]".to_string();
        }
        serde_json::to_string_pretty(&config)
    }

    /// Builds the domain resolver for the configured base domain.
    pub fn domain_resolver(&self) -> Result<DomainResolver, ConfigError> {
        DomainResolver::new(&self.base_domain).map_err(ConfigError::InvalidBaseDomain)
    }

    /// Loads the plan table from `plan_limits_path`, or the built-in table.
    pub fn plan_limits(&self) -> Result<PlanLimitsTable, ConfigError> {
        match &self.plan_limits_path {
            Some(path) => PlanLimitsTable::from_path(path).map_err(|source| {
                ConfigError::PlanLimits {
                    path: path.clone(),
                    source,
                }
            }),
            None => Ok(PlanLimitsTable::standard()),
        }
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator_tokens.is_empty() {
            return Err(ConfigError::MissingOperatorTokens);
        }

        self.domain_resolver()?;
        self.plan_limits()?;
        self.domain_cache.validate()?;

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections {
                value: self.db_max_connections,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://localhost:5432/proposals".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_base_domain() -> String {
    "localhost".to_string()
}

fn default_domain_cache_capacity() -> usize {
    1024
}

fn default_domain_cache_ttl_seconds() -> u64 {
    60
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error(
        "no operator tokens configured; set PROPOSALS_OPERATOR_TOKEN or PROPOSALS_OPERATOR_TOKENS"
    )]
    MissingOperatorTokens,
    #[error("invalid base domain: {0}")]
    InvalidBaseDomain(DomainError),
    #[error("failed to load plan limits from {path}: {source}")]
    PlanLimits {
        path: PathBuf,
        source: PlanTableError,
    },
    #[error("domain cache capacity must be at least 1, got {value}")]
    InvalidDomainCacheCapacity { value: usize },
    #[error("domain cache TTL must be between 1 and 86400 seconds, got {value}")]
    InvalidDomainCacheTtl { value: u64 },
    #[error("database max connections must be at least 1, got {value}")]
    InvalidDbMaxConnections { value: u32 },
    #[error("invalid value '{value}' for {key}")]
    InvalidNumber { key: String, value: String },
}

/// Loads configuration using layered `.env` files and `PROPOSALS_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads, validates and returns the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_string(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url =
            take_string(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take_number(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take_number(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Support both a single token and a comma-separated list
        let operator_tokens = if let Some(tokens) = layered.remove("OPERATOR_TOKENS") {
            tokens
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else if let Some(token) = take_string(&mut layered, "OPERATOR_TOKEN") {
            vec![token]
        } else {
            Vec::new()
        };

        let base_domain =
            take_string(&mut layered, "BASE_DOMAIN").unwrap_or_else(default_base_domain);
        let plan_limits_path = take_string(&mut layered, "PLAN_LIMITS_PATH").map(PathBuf::from);

        let domain_cache = DomainCacheConfig {
            capacity: take_number(&mut layered, "DOMAIN_CACHE_CAPACITY")?
                .unwrap_or_else(default_domain_cache_capacity),
            ttl_seconds: take_number(&mut layered, "DOMAIN_CACHE_TTL_SECONDS")?
                .unwrap_or_else(default_domain_cache_ttl_seconds),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            operator_tokens,
            base_domain,
            plan_limits_path,
            domain_cache,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_number<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match take_string(values, key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
        None => Ok(None),
    }
}
