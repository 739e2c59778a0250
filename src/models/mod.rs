//! # Data Models
//!
//! SeaORM entities for tenants, their proposals, and plan-limited seats.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod api_key;
pub mod proposal;
pub mod proposal_tier;
pub mod team_member;
pub mod tenant;
pub mod tier_benefit;

pub use api_key::Entity as ApiKey;
pub use proposal::Entity as Proposal;
pub use proposal_tier::Entity as ProposalTier;
pub use team_member::Entity as TeamMember;
pub use tenant::Entity as Tenant;
pub use tier_benefit::Entity as TierBenefit;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "sponsorship-proposals".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
