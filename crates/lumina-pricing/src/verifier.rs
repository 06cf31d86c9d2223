//! §4.6 Invariant Verifier — runs unconditionally at the end of `calculate`.
//!
//! Enforces I1–I6 with tolerance `EPSILON`. A violation is a
//! programming-error signal: [`crate::calculate`] aborts the process on it;
//! [`crate::try_calculate`] hands the structured report back instead, for
//! tests and other callers that want to assert rather than crash.

use crate::EPSILON;
use lumina_proto::CalculationResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A structured report of exactly which invariant failed and why.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("invariant violation: {description}")]
pub struct InvariantViolation {
    pub description: String,
    pub sp_arn: Option<String>,
    pub expected: f64,
    pub actual: f64,
    pub details: HashMap<String, String>,
}

impl InvariantViolation {
    fn new(description: impl Into<String>, expected: f64, actual: f64) -> Self {
        Self {
            description: description.into(),
            sp_arn: None,
            expected,
            actual,
            details: HashMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    fn with_sp_arn(mut self, arn: impl Into<String>) -> Self {
        self.sp_arn = Some(arn.into());
        self
    }
}

/// Check I1–I6 against a completed [`CalculationResult`].
///
/// `known_sp_arns` is the set of ARNs present in the original
/// `savings_plans` input — used to check that every `sp_arn` attribution
/// references a real input SP.
pub fn verify(result: &CalculationResult, known_sp_arns: &HashSet<String>) -> Result<(), InvariantViolation> {
    for cost in result.instance_costs.values() {
        // I1: effective_cost >= 0
        if cost.effective_cost < -EPSILON {
            return Err(InvariantViolation::new("effective_cost must be non-negative", 0.0, cost.effective_cost)
                .with_detail("instance_id", &cost.instance_id)
                .with_detail("coverage_type", cost.coverage_type));
        }

        // I2: ri_coverage + sp_coverage <= shelf_price + eps
        let covered = cost.ri_coverage + cost.sp_coverage;
        if covered > cost.shelf_price + EPSILON {
            return Err(InvariantViolation::new(
                "ri_coverage + sp_coverage exceeds shelf_price",
                cost.shelf_price,
                covered,
            )
            .with_detail("instance_id", &cost.instance_id)
            .with_detail("ri_coverage", cost.ri_coverage)
            .with_detail("sp_coverage", cost.sp_coverage));
        }

        // I5: sp_arn (when set) must reference a known input SP.
        if let Some(arn) = &cost.sp_arn {
            if !known_sp_arns.contains(arn) {
                return Err(InvariantViolation::new("sp_arn references an unknown savings plan", 0.0, 1.0)
                    .with_sp_arn(arn.clone())
                    .with_detail("instance_id", &cost.instance_id));
            }
        }

        // I6: spot instances carry zero RI/SP coverage and are priced at spot_price.
        if cost.is_spot {
            if cost.ri_coverage != 0.0 || cost.sp_coverage != 0.0 {
                return Err(InvariantViolation::new("spot instance must carry zero RI/SP coverage", 0.0, cost.ri_coverage + cost.sp_coverage)
                    .with_detail("instance_id", &cost.instance_id));
            }
            if (cost.effective_cost - cost.spot_price).abs() > EPSILON {
                return Err(InvariantViolation::new(
                    "spot instance effective_cost must equal spot_price",
                    cost.spot_price,
                    cost.effective_cost,
                )
                .with_detail("instance_id", &cost.instance_id));
            }
        }
    }

    for util in result.savings_plan_utilization.values() {
        // I3: utilization + remaining == commitment
        let total = util.current_utilization_rate + util.remaining_capacity;
        if (total - util.hourly_commitment).abs() > EPSILON {
            return Err(InvariantViolation::new(
                "current_utilization_rate + remaining_capacity must equal commitment",
                util.hourly_commitment,
                total,
            )
            .with_sp_arn(util.arn.clone()));
        }

        // I4: 0 <= utilization <= commitment
        if util.current_utilization_rate < -EPSILON || util.current_utilization_rate > util.hourly_commitment + EPSILON {
            return Err(InvariantViolation::new(
                "current_utilization_rate out of [0, commitment] bounds",
                util.hourly_commitment,
                util.current_utilization_rate,
            )
            .with_sp_arn(util.arn.clone()));
        }
    }

    Ok(())
}

/// Log the violation at `error!` and abort — the intent of §4.6/§7 is that
/// it is better to crash than publish corrupt cost metrics.
pub fn abort(violation: InvariantViolation) -> ! {
    tracing::error!(
        description = %violation.description,
        expected = violation.expected,
        actual = violation.actual,
        sp_arn = ?violation.sp_arn,
        details = ?violation.details,
        "invariant violation — aborting calculation"
    );
    panic!("lumina-pricing invariant violation: {violation}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lumina_proto::{CoverageType, InstanceCost, PricingAccuracy, SavingsPlanUtilization};
    use std::collections::HashMap;

    fn base_cost() -> InstanceCost {
        InstanceCost {
            instance_id: "i-1".into(),
            instance_type: "m5.xlarge".into(),
            region: "us-west-2".into(),
            availability_zone: "us-west-2a".into(),
            account_id: "acc-1".into(),
            shelf_price: 2.0,
            effective_cost: 2.0,
            coverage_type: CoverageType::OnDemand,
            ri_coverage: 0.0,
            sp_coverage: 0.0,
            sp_arn: None,
            on_demand_cost: 2.0,
            spot_price: 0.0,
            is_spot: false,
            pricing_accuracy: PricingAccuracy::Accurate,
        }
    }

    fn result_with(costs: Vec<InstanceCost>, utils: Vec<SavingsPlanUtilization>) -> CalculationResult {
        let instance_costs = costs.into_iter().map(|c| (c.instance_id.clone(), c)).collect();
        let savings_plan_utilization = utils.into_iter().map(|u| (u.arn.clone(), u)).collect::<HashMap<_, _>>();
        CalculationResult {
            instance_costs,
            savings_plan_utilization,
            total_shelf_price: 0.0,
            total_estimated_cost: 0.0,
            total_savings: 0.0,
            calculated_at: Utc::now(),
        }
    }

    #[test]
    fn test_verify_passes_for_clean_result() {
        let result = result_with(vec![base_cost()], vec![]);
        assert!(verify(&result, &HashSet::new()).is_ok());
    }

    #[test]
    fn test_verify_catches_negative_effective_cost() {
        let mut cost = base_cost();
        cost.effective_cost = -1.0;
        let result = result_with(vec![cost], vec![]);
        assert!(verify(&result, &HashSet::new()).is_err());
    }

    #[test]
    fn test_verify_catches_over_coverage() {
        let mut cost = base_cost();
        cost.ri_coverage = 2.0;
        cost.sp_coverage = 1.0;
        let result = result_with(vec![cost], vec![]);
        assert!(verify(&result, &HashSet::new()).is_err());
    }

    #[test]
    fn test_verify_catches_unbalanced_sp_utilization() {
        let util = SavingsPlanUtilization {
            arn: "arn:1".into(),
            hourly_commitment: 3.0,
            current_utilization_rate: 2.0,
            remaining_capacity: 0.5, // should be 1.0
            utilization_percent: 66.0,
            remaining_hours: 100.0,
            end: Utc::now(),
        };
        let result = result_with(vec![], vec![util]);
        assert!(verify(&result, &HashSet::new()).is_err());
    }

    #[test]
    fn test_verify_catches_unknown_sp_arn() {
        let mut cost = base_cost();
        cost.sp_arn = Some("arn:unknown".into());
        let result = result_with(vec![cost], vec![]);
        assert!(verify(&result, &HashSet::new()).is_err());
        let mut known = HashSet::new();
        known.insert("arn:unknown".to_string());
        assert!(verify(&result, &known).is_ok());
    }

    #[test]
    fn test_verify_catches_spot_with_ri_coverage() {
        let mut cost = base_cost();
        cost.is_spot = true;
        cost.spot_price = 0.5;
        cost.effective_cost = 0.5;
        cost.ri_coverage = 2.0;
        let result = result_with(vec![cost], vec![]);
        assert!(verify(&result, &HashSet::new()).is_err());
    }
}
