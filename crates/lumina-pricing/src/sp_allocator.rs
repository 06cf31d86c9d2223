//! §4.3 SP Allocator — applies Savings Plans after Reserved Instances.
//!
//! Two sub-passes, in order: EC2-Instance SPs (region+family scoped), then
//! Compute SPs (fully flexible). Within a pass, SPs are processed in input
//! order and each consumes eligible instances in the stable order (§4.7).
//! An instance attributed to any SP in an earlier iteration is never
//! revisited — at most one SP covers a given instance.

use crate::ordering::stable_indices;
use crate::table::CostTable;
use crate::{DiscountConfig, SpRateReader, EPSILON};
use lumina_proto::{normalized_os, CoverageType, Instance, InstanceCost, PricingAccuracy, SavingsPlan, SavingsPlanType};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Working state accumulated across both passes — per-SP remaining capacity
/// and commitment consumed — folded into [`lumina_proto::SavingsPlanUtilization`]
/// records by the caller.
pub struct SpAllocation {
    pub remaining_capacity: HashMap<String, f64>,
    pub utilization: HashMap<String, f64>,
}

fn eligible(sp: &SavingsPlan, instance: &Instance, cost: &InstanceCost, attributed: &HashSet<String>) -> bool {
    instance.is_running()
        && !instance.is_spot()
        && !attributed.contains(&instance.id)
        && cost.effective_cost > EPSILON
        && sp.account_id == instance.account_id
        && match sp.plan_type {
            SavingsPlanType::Ec2Instance => sp.region == instance.region && sp.instance_family == instance.family(),
            SavingsPlanType::Compute => true,
        }
}

pub fn allocate(
    table: &mut CostTable,
    instances: &[Instance],
    savings_plans: &[SavingsPlan],
    sp_rates: &dyn SpRateReader,
    config: &dyn DiscountConfig,
) -> SpAllocation {
    let order = stable_indices(instances);
    let mut attributed: HashSet<String> = HashSet::new();
    let mut remaining_capacity: HashMap<String, f64> =
        savings_plans.iter().map(|sp| (sp.arn.clone(), sp.commitment.max(0.0))).collect();
    let mut utilization: HashMap<String, f64> = savings_plans.iter().map(|sp| (sp.arn.clone(), 0.0)).collect();

    for pass_type in [SavingsPlanType::Ec2Instance, SavingsPlanType::Compute] {
        for sp in savings_plans.iter().filter(|sp| sp.plan_type == pass_type) {
            allocate_one(
                table,
                instances,
                &order,
                sp,
                sp_rates,
                config,
                &mut attributed,
                &mut remaining_capacity,
                &mut utilization,
            );
        }
    }

    SpAllocation { remaining_capacity, utilization }
}

#[allow(clippy::too_many_arguments)]
fn allocate_one(
    table: &mut CostTable,
    instances: &[Instance],
    order: &[usize],
    sp: &SavingsPlan,
    sp_rates: &dyn SpRateReader,
    config: &dyn DiscountConfig,
    attributed: &mut HashSet<String>,
    remaining_capacity: &mut HashMap<String, f64>,
    utilization: &mut HashMap<String, f64>,
) {
    let coverage_type = CoverageType::from(sp.plan_type);
    let mut assigned = 0usize;

    for &inst_idx in order {
        let cap = *remaining_capacity.get(&sp.arn).unwrap_or(&0.0);
        if cap <= EPSILON {
            break;
        }

        let instance = &instances[inst_idx];
        let Some(cost_idx) = table.index_of(&instance.id) else {
            continue;
        };
        if !eligible(sp, instance, table.get(cost_idx), attributed) {
            continue;
        }

        let shelf = table.get(cost_idx).shelf_price;
        let ri_coverage = table.get(cost_idx).ri_coverage;
        let remaining = table.get(cost_idx).effective_cost;

        let (rate, accuracy) = match sp_rates.sp_rate(
            &sp.arn,
            &instance.instance_type,
            &instance.region,
            instance.tenancy,
            &normalized_os(&instance.platform),
        ) {
            Some(r) => (r, PricingAccuracy::Accurate),
            None => {
                let multiplier = match sp.plan_type {
                    SavingsPlanType::Ec2Instance => config.ec2_instance_discount(),
                    SavingsPlanType::Compute => config.compute_discount(),
                };
                (shelf * multiplier, PricingAccuracy::Estimated)
            }
        };

        let (mut sp_coverage, mut effective_cost, mut on_demand_cost) = if cap >= rate {
            (rate, rate, 0.0)
        } else {
            (cap, remaining - cap, remaining - cap)
        };

        // Belt-and-braces guard for I2; should never trigger under the
        // eligibility rules above (ri_coverage is always 0 here).
        let max_sp_coverage = (shelf - ri_coverage).max(0.0);
        if sp_coverage > max_sp_coverage + EPSILON {
            warn!(
                arn = %sp.arn,
                instance_id = %instance.id,
                sp_coverage,
                shelf_price = shelf,
                "sp_coverage would exceed shelf price; clamping"
            );
            sp_coverage = max_sp_coverage;
            effective_cost = (shelf - ri_coverage - sp_coverage).max(0.0);
            on_demand_cost = effective_cost;
        }

        let record = table.get_mut(cost_idx);
        record.effective_cost = effective_cost;
        record.sp_coverage = sp_coverage;
        record.sp_arn = Some(sp.arn.clone());
        record.on_demand_cost = on_demand_cost;
        record.coverage_type = coverage_type;
        record.pricing_accuracy = accuracy;

        attributed.insert(instance.id.clone());
        *remaining_capacity.entry(sp.arn.clone()).or_insert(0.0) -= sp_coverage;
        *utilization.entry(sp.arn.clone()).or_insert(0.0) += sp_coverage;
        assigned += 1;
    }

    if assigned > 0 {
        info!(arn = %sp.arn, assigned, plan_type = %sp.plan_type, "SP coverage assigned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{DefaultDiscountConfig, NoSpRates};
    use crate::initializer::initialize;
    use crate::ri_allocator;
    use chrono::{Duration, Utc};
    use lumina_proto::{InstanceState, Lifecycle, OnDemandPriceTable, ReservedInstance, ReservedInstanceState, Tenancy};

    fn inst(id: &str, launch_offset_mins: i64) -> Instance {
        Instance {
            id: id.to_string(),
            instance_type: "m5.2xlarge".into(),
            region: "us-west-2".into(),
            availability_zone: "us-west-2a".into(),
            account_id: "acc-1".into(),
            state: InstanceState::Running,
            lifecycle: Lifecycle::OnDemand,
            platform: "linux".into(),
            tenancy: Tenancy::Default,
            launch_time: Utc::now() + Duration::minutes(launch_offset_mins),
        }
    }

    fn ri(count: u32) -> ReservedInstance {
        ReservedInstance {
            id: "ri-1".into(),
            instance_type: "m5.2xlarge".into(),
            instance_count: count,
            account_id: "acc-1".into(),
            region: "us-west-2".into(),
            availability_zone: "us-west-2a".into(),
            state: ReservedInstanceState::Active,
            platform: "linux".into(),
        }
    }

    fn compute_sp(commitment: f64) -> SavingsPlan {
        SavingsPlan {
            arn: "arn:sp:compute".into(),
            account_id: "acc-1".into(),
            plan_type: SavingsPlanType::Compute,
            commitment,
            region: String::new(),
            instance_family: String::new(),
            start: Utc::now() - Duration::days(1),
            end: Utc::now() + Duration::days(300),
        }
    }

    fn prices() -> OnDemandPriceTable {
        let mut p = OnDemandPriceTable::new();
        p.insert(("m5.2xlarge".to_string(), "us-west-2".to_string()), 2.0);
        p
    }

    #[test]
    fn test_s2_ri_plus_compute_sp_partial() {
        let instances: Vec<Instance> = (0..15).map(|i| inst(&format!("i-{i:02}"), i)).collect();
        let mut table = initialize(&instances, &prices());
        ri_allocator::allocate(&mut table, &instances, &[ri(5)]);

        let sp = compute_sp(3.0);
        let alloc = allocate(&mut table, &instances, &[sp], &NoSpRates, &DefaultDiscountConfig);

        // rate = 2.00 * 0.72 = 1.44; full coverage for i-05, i-06 (2*1.44=2.88, remaining 0.12)
        // i-07 gets partial coverage of 0.12 -> effective_cost = 2.00 - 0.12 = 1.88
        let c5 = table.get(table.index_of("i-05").unwrap());
        assert_eq!(c5.coverage_type, CoverageType::ComputeSavingsPlan);
        assert!((c5.effective_cost - 1.44).abs() < 1e-9);
        assert!((c5.sp_coverage - 1.44).abs() < 1e-9);

        let c6 = table.get(table.index_of("i-06").unwrap());
        assert!((c6.effective_cost - 1.44).abs() < 1e-9);

        let c7 = table.get(table.index_of("i-07").unwrap());
        assert!((c7.sp_coverage - 0.12).abs() < 1e-6);
        assert!((c7.effective_cost - 1.88).abs() < 1e-6);

        // remaining 7 stay on-demand
        for i in 8..15 {
            let id = format!("i-{i:02}");
            let c = table.get(table.index_of(&id).unwrap());
            assert_eq!(c.coverage_type, CoverageType::OnDemand);
            assert_eq!(c.effective_cost, 2.0);
        }

        let utilization = alloc.utilization.get("arn:sp:compute").copied().unwrap_or(0.0);
        assert!((utilization - 3.0).abs() < 1e-6);
        let remaining = alloc.remaining_capacity.get("arn:sp:compute").copied().unwrap_or(-1.0);
        assert!(remaining.abs() < 1e-6);
    }

    #[test]
    fn test_sp_skips_already_attributed_instances() {
        let instances = vec![inst("i-0", 0)];
        let mut table = initialize(&instances, &prices());
        let sp_a = compute_sp(10.0);
        let mut sp_b = compute_sp(10.0);
        sp_b.arn = "arn:sp:compute-2".into();

        allocate(&mut table, &instances, &[sp_a, sp_b], &NoSpRates, &DefaultDiscountConfig);
        let cost = table.get(table.index_of("i-0").unwrap());
        assert_eq!(cost.sp_arn.as_deref(), Some("arn:sp:compute"));
    }

    #[test]
    fn test_sp_excludes_ri_covered_instances() {
        let instances = vec![inst("i-0", 0)];
        let mut table = initialize(&instances, &prices());
        ri_allocator::allocate(&mut table, &instances, &[ri(1)]);
        allocate(&mut table, &instances, &[compute_sp(10.0)], &NoSpRates, &DefaultDiscountConfig);
        let cost = table.get(table.index_of("i-0").unwrap());
        assert_eq!(cost.coverage_type, CoverageType::ReservedInstance);
        assert_eq!(cost.sp_coverage, 0.0);
    }
}
