//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for
//! tenants, proposals and plan usage.

use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

use crate::domains::DomainError;
use crate::error::ApiError;

pub mod proposal;
pub mod tenant;
pub mod usage;

pub use proposal::{ProposalRepository, PublicProposal, PublicTier};
pub use tenant::TenantRepository;
pub use usage::{UsageRepository, UsageSource};

/// Errors surfaced by repositories that enforce domain rules.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(err) => err.into(),
            RepositoryError::Domain(err) => err.into(),
            RepositoryError::NotFound(what) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found"),
            ),
            RepositoryError::Conflict(message) => {
                Self::new(StatusCode::CONFLICT, "CONFLICT", message)
            }
        }
    }
}
