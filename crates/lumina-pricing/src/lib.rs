//! The Lumina cost allocation engine.
//!
//! One entry point, [`calculate`], visits a strictly linear pipeline —
//! Initializer → RI Allocator → SP Allocator → Spot Overlay → Aggregator →
//! Invariant Verifier — and returns a [`CalculationResult`]. The pipeline is
//! pure and stateless: identical inputs always produce an identical result
//! (modulo the wallclock `calculated_at` stamp), since the only source of
//! order-dependence, the stable instance ordering (§4.7 in the design docs),
//! is independent of input order.

#![forbid(unsafe_code)]

mod aggregator;
mod collaborators;
mod initializer;
mod ordering;
mod ri_allocator;
mod sp_allocator;
mod spot_overlay;
mod table;
mod verifier;

pub use collaborators::{DefaultDiscountConfig, DiscountConfig, NoSpRates, NoSpotPrices, SpRateReader, SpotPriceReader};
pub use verifier::InvariantViolation;

use chrono::Utc;
use lumina_proto::{CalculationInputs, CalculationResult, SavingsPlanUtilization};
use std::collections::HashSet;

/// Tolerance used throughout the pipeline for floating-point comparisons.
pub const EPSILON: f64 = 1e-6;

/// Run the pipeline and panic on an invariant violation.
///
/// This is the entry point production callers use: a violation means a bug
/// in the engine itself, and publishing a result built on a broken
/// invariant is worse than crashing the process that would have published
/// it (§4.6/§7).
pub fn calculate(
    inputs: &CalculationInputs,
    spot_prices: &dyn SpotPriceReader,
    sp_rates: &dyn SpRateReader,
    discount_config: &dyn DiscountConfig,
) -> CalculationResult {
    match try_calculate(inputs, spot_prices, sp_rates, discount_config) {
        Ok(result) => result,
        Err(violation) => verifier::abort(violation),
    }
}

/// Run the pipeline and return the invariant violation (if any) instead of
/// panicking. Exists for tests and other callers that want to assert on the
/// failure rather than crash.
pub fn try_calculate(
    inputs: &CalculationInputs,
    spot_prices: &dyn SpotPriceReader,
    sp_rates: &dyn SpRateReader,
    discount_config: &dyn DiscountConfig,
) -> Result<CalculationResult, InvariantViolation> {
    let mut table = initializer::initialize(&inputs.instances, &inputs.on_demand_prices);

    ri_allocator::allocate(&mut table, &inputs.instances, &inputs.reserved_instances);

    let mut sp_allocation = sp_allocator::allocate(
        &mut table,
        &inputs.instances,
        &inputs.savings_plans,
        sp_rates,
        discount_config,
    );

    spot_overlay::apply(&mut table, &inputs.instances, spot_prices, &mut sp_allocation);

    let totals = aggregator::aggregate(&table);
    let calculated_at = Utc::now();

    let savings_plan_utilization = inputs
        .savings_plans
        .iter()
        .map(|sp| {
            let utilization = sp_allocation.utilization.get(&sp.arn).copied().unwrap_or(0.0);
            let remaining = sp_allocation.remaining_capacity.get(&sp.arn).copied().unwrap_or(sp.commitment);
            let utilization_percent = if sp.commitment > EPSILON {
                (utilization / sp.commitment) * 100.0
            } else {
                0.0
            };
            let remaining_hours = (sp.end - calculated_at).num_seconds().max(0) as f64 / 3600.0;
            (
                sp.arn.clone(),
                SavingsPlanUtilization {
                    arn: sp.arn.clone(),
                    hourly_commitment: sp.commitment,
                    current_utilization_rate: utilization,
                    remaining_capacity: remaining,
                    utilization_percent,
                    remaining_hours,
                    end: sp.end,
                },
            )
        })
        .collect();

    let result = CalculationResult {
        instance_costs: table.into_map(),
        savings_plan_utilization,
        total_shelf_price: totals.total_shelf_price,
        total_estimated_cost: totals.total_estimated_cost,
        total_savings: totals.total_savings,
        calculated_at,
    };

    let known_sp_arns: HashSet<String> = inputs.savings_plans.iter().map(|sp| sp.arn.clone()).collect();
    verifier::verify(&result, &known_sp_arns)?;

    Ok(result)
}
