//! §4.4 Spot Overlay — rewrites costs of spot-lifecycle instances to the
//! current market price, applied after RI and SP.

use crate::collaborators::SpotPriceReader;
use crate::sp_allocator::SpAllocation;
use crate::table::CostTable;
use lumina_proto::{product_description, CoverageType, Instance, PricingAccuracy};
use tracing::warn;

/// For every spot instance with a cost record: reset RI/SP coverage, then
/// price at the current spot rate (or the conservative zero-fallback, §9
/// Open Questions).
pub fn apply(
    table: &mut CostTable,
    instances: &[Instance],
    spot_prices: &dyn SpotPriceReader,
    sp_allocation: &mut SpAllocation,
) {
    for instance in instances {
        if !instance.is_spot() {
            continue;
        }
        let Some(cost_idx) = table.index_of(&instance.id) else {
            continue;
        };

        // Defense in depth: §4.3's eligibility rules already exclude spot
        // instances, so this should be a no-op; roll back if it isn't.
        let (prior_sp_coverage, prior_sp_arn) = {
            let rec = table.get(cost_idx);
            (rec.sp_coverage, rec.sp_arn.clone())
        };
        if prior_sp_coverage > 0.0 {
            if let Some(arn) = prior_sp_arn {
                warn!(instance_id = %instance.id, arn = %arn, "spot instance had SP coverage; rolling back");
                *sp_allocation.utilization.entry(arn.clone()).or_insert(0.0) -= prior_sp_coverage;
                *sp_allocation.remaining_capacity.entry(arn).or_insert(0.0) += prior_sp_coverage;
            }
        }

        let record = table.get_mut(cost_idx);
        record.ri_coverage = 0.0;
        record.sp_coverage = 0.0;
        record.sp_arn = None;
        record.on_demand_cost = 0.0;

        let desc = product_description(&instance.platform);
        match spot_prices.spot_price(&instance.instance_type, &instance.availability_zone, desc) {
            Some(price) => {
                record.effective_cost = price;
                record.spot_price = price;
                record.pricing_accuracy = PricingAccuracy::Accurate;
            }
            None => {
                record.effective_cost = 0.0;
                record.spot_price = 0.0;
                record.pricing_accuracy = PricingAccuracy::Estimated;
            }
        }
        record.coverage_type = CoverageType::Spot;
        record.is_spot = true;
    }
}
