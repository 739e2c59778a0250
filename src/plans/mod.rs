//! # Plan Limits
//!
//! Subscription tiers and the immutable table mapping each tier to its numeric
//! limits and feature flags. The table is built once at startup and shared by
//! reference; nothing mutates it afterwards.

use std::{fmt, path::Path, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use utoipa::ToSchema;

pub mod evaluator;
pub mod gate;

pub use evaluator::{LimitCheckResult, LimitEvaluator};
pub use gate::PlanGate;

/// Wire value of an unlimited limit, also used for `remaining` when unlimited.
pub const UNLIMITED: i64 = -1;

/// Subscription level governing resource limits and feature access.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    EnumIter,
    DeriveActiveEnum,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PlanTier {
    #[default]
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "pro")]
    Pro,
    #[sea_orm(string_value = "enterprise")]
    Enterprise,
}

impl PlanTier {
    /// All tiers, in table order.
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Pro, PlanTier::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// Human-readable plan name used in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Pro => "Pro",
            PlanTier::Enterprise => "Enterprise",
        }
    }

    fn index(&self) -> usize {
        match self {
            PlanTier::Free => 0,
            PlanTier::Pro => 1,
            PlanTier::Enterprise => 2,
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = PlanTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(PlanTableError::UnknownTier(other.to_string())),
        }
    }
}

/// Category of plan-limited resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Proposals,
    ApiKeys,
    CustomDomains,
    TeamMembers,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Proposals,
        ResourceKind::ApiKeys,
        ResourceKind::CustomDomains,
        ResourceKind::TeamMembers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Proposals => "proposals",
            ResourceKind::ApiKeys => "apiKeys",
            ResourceKind::CustomDomains => "customDomains",
            ResourceKind::TeamMembers => "teamMembers",
        }
    }

    /// Plural noun used in limit messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Proposals => "proposals",
            ResourceKind::ApiKeys => "API keys",
            ResourceKind::CustomDomains => "custom domains",
            ResourceKind::TeamMembers => "team members",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = LimitError;

    /// Accepts both `apiKeys` and `api_keys` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposals" => Ok(ResourceKind::Proposals),
            "apiKeys" | "api_keys" => Ok(ResourceKind::ApiKeys),
            "customDomains" | "custom_domains" => Ok(ResourceKind::CustomDomains),
            "teamMembers" | "team_members" => Ok(ResourceKind::TeamMembers),
            other => Err(LimitError::UnknownResourceKind(other.to_string())),
        }
    }
}

/// Boolean feature flag carried by every plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    RemoveBranding,
    Analytics,
    PrioritySupport,
    CustomTemplates,
    ApiAccess,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::RemoveBranding,
        Feature::Analytics,
        Feature::PrioritySupport,
        Feature::CustomTemplates,
        Feature::ApiAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::RemoveBranding => "removeBranding",
            Feature::Analytics => "analytics",
            Feature::PrioritySupport => "prioritySupport",
            Feature::CustomTemplates => "customTemplates",
            Feature::ApiAccess => "apiAccess",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = LimitError;

    /// Numeric limit fields (`maxProposals`, ...) are not features and are
    /// rejected like any unknown key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "removeBranding" | "remove_branding" => Ok(Feature::RemoveBranding),
            "analytics" => Ok(Feature::Analytics),
            "prioritySupport" | "priority_support" => Ok(Feature::PrioritySupport),
            "customTemplates" | "custom_templates" => Ok(Feature::CustomTemplates),
            "apiAccess" | "api_access" => Ok(Feature::ApiAccess),
            other => Err(LimitError::InvalidFeatureKey(other.to_string())),
        }
    }
}

/// A numeric plan limit. Serialized as an integer where `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    Max(u32),
}

impl Limit {
    /// Integer form, `-1` for unlimited.
    pub fn as_i64(&self) -> i64 {
        match self {
            Limit::Unlimited => UNLIMITED,
            Limit::Max(max) => i64::from(*max),
        }
    }

    pub fn from_i64(value: i64) -> Result<Self, PlanTableError> {
        match value {
            UNLIMITED => Ok(Limit::Unlimited),
            v if v >= 0 => u32::try_from(v)
                .map(Limit::Max)
                .map_err(|_| PlanTableError::InvalidLimit(v)),
            v => Err(PlanTableError::InvalidLimit(v)),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Limit::from_i64(raw).map_err(serde::de::Error::custom)
    }
}

/// Limits and feature flags for one plan tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlanLimits {
    pub tier: PlanTier,
    #[schema(value_type = i64, example = 25)]
    pub max_proposals: Limit,
    #[schema(value_type = i64, example = 5)]
    pub max_api_keys: Limit,
    #[schema(value_type = i64, example = 1)]
    pub max_custom_domains: Limit,
    #[schema(value_type = i64, example = 5)]
    pub max_team_members: Limit,
    pub remove_branding: bool,
    pub analytics: bool,
    pub priority_support: bool,
    pub custom_templates: bool,
    pub api_access: bool,
}

impl PlanLimits {
    pub fn limit_for(&self, resource: ResourceKind) -> Limit {
        match resource {
            ResourceKind::Proposals => self.max_proposals,
            ResourceKind::ApiKeys => self.max_api_keys,
            ResourceKind::CustomDomains => self.max_custom_domains,
            ResourceKind::TeamMembers => self.max_team_members,
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::RemoveBranding => self.remove_branding,
            Feature::Analytics => self.analytics,
            Feature::PrioritySupport => self.priority_support,
            Feature::CustomTemplates => self.custom_templates,
            Feature::ApiAccess => self.api_access,
        }
    }
}

/// Errors raised while evaluating limits or feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    #[error("unknown resource kind '{0}'")]
    UnknownResourceKind(String),
    #[error("'{0}' is not a boolean plan feature")]
    InvalidFeatureKey(String),
}

/// Errors raised while building a [`PlanLimitsTable`].
#[derive(Debug, Error)]
pub enum PlanTableError {
    #[error("plan limits table has no row for tier '{0}'")]
    MissingTier(PlanTier),
    #[error("plan limits table has more than one row for tier '{0}'")]
    DuplicateTier(PlanTier),
    #[error("unknown plan tier '{0}'")]
    UnknownTier(String),
    #[error("invalid plan limit {0}; use -1 for unlimited")]
    InvalidLimit(i64),
    #[error("failed to read plan limits file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse plan limits file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Complete, immutable `PlanTier -> PlanLimits` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLimitsTable {
    rows: [PlanLimits; 3],
}

impl PlanLimitsTable {
    /// The built-in plan catalogue.
    pub fn standard() -> Self {
        Self {
            rows: [
                PlanLimits {
                    tier: PlanTier::Free,
                    max_proposals: Limit::Max(1),
                    max_api_keys: Limit::Max(0),
                    max_custom_domains: Limit::Max(0),
                    max_team_members: Limit::Max(1),
                    remove_branding: false,
                    analytics: false,
                    priority_support: false,
                    custom_templates: false,
                    api_access: false,
                },
                PlanLimits {
                    tier: PlanTier::Pro,
                    max_proposals: Limit::Max(25),
                    max_api_keys: Limit::Max(5),
                    max_custom_domains: Limit::Max(1),
                    max_team_members: Limit::Max(5),
                    remove_branding: true,
                    analytics: true,
                    priority_support: false,
                    custom_templates: true,
                    api_access: true,
                },
                PlanLimits {
                    tier: PlanTier::Enterprise,
                    max_proposals: Limit::Unlimited,
                    max_api_keys: Limit::Unlimited,
                    max_custom_domains: Limit::Unlimited,
                    max_team_members: Limit::Unlimited,
                    remove_branding: true,
                    analytics: true,
                    priority_support: true,
                    custom_templates: true,
                    api_access: true,
                },
            ],
        }
    }

    /// Builds a table from rows, requiring exactly one row per tier.
    pub fn from_rows(rows: Vec<PlanLimits>) -> Result<Self, PlanTableError> {
        let mut slots: [Option<PlanLimits>; 3] = [None, None, None];

        for row in rows {
            let slot = &mut slots[row.tier.index()];
            if slot.is_some() {
                return Err(PlanTableError::DuplicateTier(row.tier));
            }
            *slot = Some(row);
        }

        let [free, pro, enterprise] = slots;
        Ok(Self {
            rows: [
                free.ok_or(PlanTableError::MissingTier(PlanTier::Free))?,
                pro.ok_or(PlanTableError::MissingTier(PlanTier::Pro))?,
                enterprise.ok_or(PlanTableError::MissingTier(PlanTier::Enterprise))?,
            ],
        })
    }

    /// Parses a JSON array of [`PlanLimits`] rows.
    pub fn from_json(json: &str) -> Result<Self, PlanTableError> {
        let rows: Vec<PlanLimits> = serde_json::from_str(json)?;
        Self::from_rows(rows)
    }

    pub fn from_path(path: &Path) -> Result<Self, PlanTableError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn get(&self, tier: PlanTier) -> &PlanLimits {
        &self.rows[tier.index()]
    }

    /// Rows in tier order.
    pub fn rows(&self) -> &[PlanLimits] {
        &self.rows
    }
}

impl Default for PlanLimitsTable {
    fn default() -> Self {
        Self::standard()
    }
}
