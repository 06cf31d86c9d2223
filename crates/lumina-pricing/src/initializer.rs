//! §4.1 Initializer — seeds per-instance cost records from shelf prices.

use crate::table::CostTable;
use lumina_proto::{on_demand_price, CoverageType, Instance, InstanceCost, OnDemandPriceTable, PricingAccuracy};
use tracing::debug;

/// Emit one cost record per instance with known on-demand pricing.
/// Instances lacking a positive on-demand price are silently omitted.
pub fn initialize(instances: &[Instance], prices: &OnDemandPriceTable) -> CostTable {
    let mut table = CostTable::new();
    let mut skipped = 0usize;

    for instance in instances {
        let Some(shelf_price) = on_demand_price(prices, &instance.instance_type, &instance.region) else {
            skipped += 1;
            continue;
        };

        table.push(InstanceCost {
            instance_id: instance.id.clone(),
            instance_type: instance.instance_type.clone(),
            region: instance.region.clone(),
            availability_zone: instance.availability_zone.clone(),
            account_id: instance.account_id.clone(),
            shelf_price,
            effective_cost: shelf_price,
            coverage_type: CoverageType::OnDemand,
            ri_coverage: 0.0,
            sp_coverage: 0.0,
            sp_arn: None,
            on_demand_cost: shelf_price,
            spot_price: 0.0,
            is_spot: instance.is_running() && instance.is_spot(),
            pricing_accuracy: PricingAccuracy::Accurate,
        });
    }

    if skipped > 0 {
        debug!(skipped, "instances omitted: no on-demand price available");
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lumina_proto::{InstanceState, Lifecycle, Tenancy};
    use std::collections::HashMap;

    fn inst(id: &str, instance_type: &str, region: &str) -> Instance {
        Instance {
            id: id.to_string(),
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            availability_zone: format!("{region}a"),
            account_id: "acc-1".into(),
            state: InstanceState::Running,
            lifecycle: Lifecycle::OnDemand,
            platform: "linux".into(),
            tenancy: Tenancy::Default,
            launch_time: Utc::now(),
        }
    }

    #[test]
    fn test_emits_one_record_per_priced_instance() {
        let instances = vec![inst("i-1", "m5.2xlarge", "us-west-2")];
        let mut prices = HashMap::new();
        prices.insert(("m5.2xlarge".to_string(), "us-west-2".to_string()), 2.0);

        let table = initialize(&instances, &prices);
        assert_eq!(table.len(), 1);
        let cost = table.get(table.index_of("i-1").unwrap());
        assert_eq!(cost.shelf_price, 2.0);
        assert_eq!(cost.effective_cost, 2.0);
        assert_eq!(cost.coverage_type, CoverageType::OnDemand);
    }

    #[test]
    fn test_omits_instances_without_pricing() {
        let instances = vec![inst("i-1", "m5.2xlarge", "us-west-2")];
        let prices = HashMap::new();
        let table = initialize(&instances, &prices);
        assert!(table.is_empty());
    }

    #[test]
    fn test_omits_non_positive_price() {
        let instances = vec![inst("i-1", "m5.2xlarge", "us-west-2")];
        let mut prices = HashMap::new();
        prices.insert(("m5.2xlarge".to_string(), "us-west-2".to_string()), 0.0);
        let table = initialize(&instances, &prices);
        assert!(table.is_empty());
    }
}
