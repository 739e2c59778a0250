//! Custom-domain verification status.
//!
//! ```text
//! pending ──► verifying ──► verified
//!    │            │
//!    └────────────┴──► failed
//! ```
//!
//! `verified` and `failed` are terminal. A failed domain is retried by binding
//! it again, which starts a fresh `pending` record.

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DomainError;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumIter,
    DeriveActiveEnum,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DomainStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "verifying")]
    Verifying,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Pending => "pending",
            DomainStatus::Verifying => "verifying",
            DomainStatus::Verified => "verified",
            DomainStatus::Failed => "failed",
        }
    }

    /// Same-state moves are accepted as no-ops.
    pub fn can_transition_to(&self, next: DomainStatus) -> bool {
        use DomainStatus::*;

        *self == next
            || matches!(
                (self, next),
                (Pending, Verifying) | (Verifying, Verified) | (Pending, Failed) | (Verifying, Failed)
            )
    }

    pub fn transition(self, next: DomainStatus) -> Result<DomainStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
