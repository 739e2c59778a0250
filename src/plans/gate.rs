//! Enforcement of plan limits against live usage.

use std::sync::Arc;

use metrics::counter;
use uuid::Uuid;

use super::{Feature, LimitCheckResult, LimitEvaluator, PlanTier, ResourceKind};
use crate::error::{self, ApiError};
use crate::repositories::UsageSource;

/// Pairs the pure [`LimitEvaluator`] with a [`UsageSource`].
#[derive(Clone)]
pub struct PlanGate {
    evaluator: Arc<LimitEvaluator>,
    usage: Arc<dyn UsageSource>,
}

impl PlanGate {
    pub fn new(evaluator: Arc<LimitEvaluator>, usage: Arc<dyn UsageSource>) -> Self {
        Self { evaluator, usage }
    }

    pub fn evaluator(&self) -> &LimitEvaluator {
        &self.evaluator
    }

    /// Evaluates the tenant's current usage without enforcing it.
    pub async fn check(
        &self,
        tenant_id: Uuid,
        tier: PlanTier,
        resource: ResourceKind,
    ) -> Result<LimitCheckResult, ApiError> {
        let current = self.usage.count(tenant_id, resource).await?;
        Ok(self.evaluator.evaluate(tier, resource, current))
    }

    /// [`check`](Self::check) for a resource named by its string key.
    pub async fn check_key(
        &self,
        tenant_id: Uuid,
        tier: PlanTier,
        resource: &str,
    ) -> Result<(ResourceKind, LimitCheckResult), ApiError> {
        let kind = resource.parse::<ResourceKind>()?;
        let current = self.usage.count(tenant_id, kind).await?;
        let result = self.evaluator.evaluate_key(tier, resource, current)?;
        Ok((kind, result))
    }

    /// Fails with `PLAN_LIMIT_EXCEEDED` when one more `resource` is not allowed.
    pub async fn ensure_allowed(
        &self,
        tenant_id: Uuid,
        tier: PlanTier,
        resource: ResourceKind,
    ) -> Result<LimitCheckResult, ApiError> {
        let result = self.check(tenant_id, tier, resource).await?;
        if result.allowed {
            return Ok(result);
        }

        counter!(
            "plan_limit_denied_total",
            "resource" => resource.as_str(),
            "tier" => tier.as_str()
        )
        .increment(1);
        tracing::info!(
            tenant_id = %tenant_id,
            resource = %resource,
            tier = %tier,
            current = result.current,
            limit = result.limit,
            "Plan limit reached"
        );

        Err(error::plan_limit_exceeded(resource, &result))
    }

    pub fn ensure_feature(&self, tier: PlanTier, feature: Feature) -> Result<(), ApiError> {
        if self.evaluator.has_feature_access(tier, feature) {
            Ok(())
        } else {
            Err(error::feature_not_available(
                feature.as_str(),
                tier.display_name(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use sea_orm::DbErr;

    struct FixedUsage(u64);

    #[async_trait]
    impl UsageSource for FixedUsage {
        async fn count(&self, _tenant_id: Uuid, _resource: ResourceKind) -> Result<u64, DbErr> {
            Ok(self.0)
        }
    }

    fn gate(current: u64) -> PlanGate {
        PlanGate::new(
            Arc::new(LimitEvaluator::default()),
            Arc::new(FixedUsage(current)),
        )
    }

    #[tokio::test]
    async fn allows_under_limit() {
        let result = gate(3)
            .ensure_allowed(Uuid::new_v4(), PlanTier::Pro, ResourceKind::Proposals)
            .await
            .unwrap();
        assert_eq!(result.remaining, 22);
    }

    #[tokio::test]
    async fn denies_at_limit() {
        let error = gate(1)
            .ensure_allowed(Uuid::new_v4(), PlanTier::Free, ResourceKind::Proposals)
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::FORBIDDEN);
        assert_eq!(&*error.code, "PLAN_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn check_reports_without_enforcing() {
        let result = gate(0)
            .check(Uuid::new_v4(), PlanTier::Free, ResourceKind::CustomDomains)
            .await
            .unwrap();
        assert!(!result.allowed);
        assert_eq!(result.limit, 0);
    }

    #[tokio::test]
    async fn check_key_accepts_both_spellings() {
        let gate = gate(2);
        for key in ["apiKeys", "api_keys"] {
            let (kind, result) = gate
                .check_key(Uuid::new_v4(), PlanTier::Pro, key)
                .await
                .unwrap();
            assert_eq!(kind, ResourceKind::ApiKeys);
            assert_eq!(result.current, 2);
        }

        let error = gate
            .check_key(Uuid::new_v4(), PlanTier::Pro, "widgets")
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn feature_gate() {
        let gate = gate(0);
        assert!(gate.ensure_feature(PlanTier::Pro, Feature::Analytics).is_ok());
        let error = gate
            .ensure_feature(PlanTier::Free, Feature::Analytics)
            .unwrap_err();
        assert_eq!(&*error.code, "FEATURE_NOT_AVAILABLE");
    }
}
