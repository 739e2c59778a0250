//! Limit evaluation against the plan table.
//!
//! Everything here is pure: the evaluator holds only a shared reference to the
//! immutable table and computes results from its inputs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Feature, Limit, LimitError, PlanLimitsTable, PlanTier, ResourceKind, UNLIMITED};

/// Outcome of checking current usage against a plan limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LimitCheckResult {
    /// Whether one more resource may be created
    pub allowed: bool,
    /// Current usage count
    pub current: u64,
    /// Configured limit (`-1` when unlimited)
    #[schema(example = 25)]
    pub limit: i64,
    /// Resources left before the limit (`-1` when unlimited)
    pub remaining: i64,
    /// User-facing explanation when the check is not allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Evaluates usage and feature gates for a plan tier.
#[derive(Debug, Clone)]
pub struct LimitEvaluator {
    table: Arc<PlanLimitsTable>,
}

impl LimitEvaluator {
    pub fn new(table: Arc<PlanLimitsTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PlanLimitsTable {
        &self.table
    }

    /// Checks `current_count` against the tier's limit for `resource`.
    pub fn evaluate(
        &self,
        tier: PlanTier,
        resource: ResourceKind,
        current_count: u64,
    ) -> LimitCheckResult {
        match self.table.get(tier).limit_for(resource) {
            Limit::Unlimited => LimitCheckResult {
                allowed: true,
                current: current_count,
                limit: UNLIMITED,
                remaining: UNLIMITED,
                message: None,
            },
            Limit::Max(max) => {
                let max = u64::from(max);
                let allowed = current_count < max;
                let remaining = max.saturating_sub(current_count);
                let message = (!allowed).then(|| {
                    format!(
                        "You have reached the maximum of {} {} on the {} plan. Upgrade your plan to add more.",
                        max,
                        resource.label(),
                        tier.display_name()
                    )
                });

                LimitCheckResult {
                    allowed,
                    current: current_count,
                    limit: max as i64,
                    remaining: remaining as i64,
                    message,
                }
            }
        }
    }

    /// Like [`evaluate`](Self::evaluate) but takes the resource as a string key.
    pub fn evaluate_key(
        &self,
        tier: PlanTier,
        resource: &str,
        current_count: u64,
    ) -> Result<LimitCheckResult, LimitError> {
        let resource = resource.parse::<ResourceKind>()?;
        Ok(self.evaluate(tier, resource, current_count))
    }

    pub fn has_feature_access(&self, tier: PlanTier, feature: Feature) -> bool {
        self.table.get(tier).has_feature(feature)
    }

    /// Feature lookup by key; numeric limit fields fail with `InvalidFeatureKey`.
    pub fn has_feature_access_key(&self, tier: PlanTier, feature: &str) -> Result<bool, LimitError> {
        let feature = feature.parse::<Feature>()?;
        Ok(self.has_feature_access(tier, feature))
    }
}

impl Default for LimitEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(PlanLimitsTable::standard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> LimitEvaluator {
        LimitEvaluator::default()
    }

    #[test]
    fn boundary_is_exclusive_for_every_finite_limit() {
        let evaluator = evaluator();
        for tier in PlanTier::ALL {
            for resource in ResourceKind::ALL {
                let Limit::Max(max) = evaluator.table().get(tier).limit_for(resource) else {
                    continue;
                };
                let max = u64::from(max);
                if max > 0 {
                    assert!(evaluator.evaluate(tier, resource, max - 1).allowed);
                }
                let at_limit = evaluator.evaluate(tier, resource, max);
                assert!(!at_limit.allowed, "{tier} {resource} at limit");
                assert_eq!(at_limit.remaining, 0);
                assert!(at_limit.message.is_some());
            }
        }
    }

    #[test]
    fn unlimited_always_allows() {
        let evaluator = evaluator();
        for count in [0, 1, 10_000_000, u64::MAX] {
            let result = evaluator.evaluate(PlanTier::Enterprise, ResourceKind::Proposals, count);
            assert!(result.allowed);
            assert_eq!(result.limit, -1);
            assert_eq!(result.remaining, -1);
            assert_eq!(result.message, None);
        }
    }

    #[test]
    fn remaining_never_goes_negative() {
        let result = evaluator().evaluate(PlanTier::Free, ResourceKind::Proposals, 40);
        assert!(!result.allowed);
        assert_eq!(result.current, 40);
        assert_eq!(result.limit, 1);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn zero_count_on_zero_limit_is_denied_without_error() {
        let result = evaluator().evaluate(PlanTier::Free, ResourceKind::ApiKeys, 0);
        assert!(!result.allowed);
        assert_eq!(result.limit, 0);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn pro_plan_reports_remaining() {
        let result = evaluator().evaluate(PlanTier::Pro, ResourceKind::Proposals, 10);
        assert_eq!(
            result,
            LimitCheckResult {
                allowed: true,
                current: 10,
                limit: 25,
                remaining: 15,
                message: None,
            }
        );
    }

    #[test]
    fn denied_message_names_plan_and_resource() {
        let result = evaluator().evaluate(PlanTier::Pro, ResourceKind::CustomDomains, 1);
        let message = result.message.unwrap();
        assert!(message.contains("custom domains"));
        assert!(message.contains("Pro plan"));
    }

    #[test]
    fn evaluate_key_rejects_unknown_resource() {
        assert_eq!(
            evaluator().evaluate_key(PlanTier::Pro, "webhooks", 0),
            Err(LimitError::UnknownResourceKind("webhooks".to_string()))
        );
        assert!(evaluator().evaluate_key(PlanTier::Pro, "teamMembers", 0).is_ok());
    }

    #[test]
    fn feature_lookup_by_key() {
        let evaluator = evaluator();
        assert_eq!(
            evaluator.has_feature_access_key(PlanTier::Pro, "analytics"),
            Ok(true)
        );
        assert_eq!(
            evaluator.has_feature_access_key(PlanTier::Pro, "prioritySupport"),
            Ok(false)
        );
        assert_eq!(
            evaluator.has_feature_access_key(PlanTier::Pro, "maxProposals"),
            Err(LimitError::InvalidFeatureKey("maxProposals".to_string()))
        );
    }

    #[test]
    fn unlimited_result_serializes_without_message() {
        let result = evaluator().evaluate(PlanTier::Enterprise, ResourceKind::TeamMembers, 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["limit"], -1);
        assert!(json.get("message").is_none());
    }
}
