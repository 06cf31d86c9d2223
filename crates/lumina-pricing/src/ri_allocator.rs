//! §4.2 RI Allocator — applies Reserved Instances before any Savings Plan.
//!
//! RI coverage is a discrete, all-or-nothing assignment: one RI-unit covers
//! exactly one matching instance in full. There is no fractional coverage.

use crate::ordering::stable_indices;
use crate::table::CostTable;
use lumina_proto::{CoverageType, Instance, ReservedInstance};
use tracing::info;

fn matches(ri: &ReservedInstance, instance: &Instance) -> bool {
    ri.is_active()
        && instance.is_running()
        && !instance.is_spot()
        && ri.account_id == instance.account_id
        && ri.instance_type == instance.instance_type
        && if ri.is_regional() {
            ri.region == instance.region
        } else {
            ri.availability_zone == instance.availability_zone
        }
}

/// Process RIs in input order; for each, walk the stable instance order and
/// assign full coverage to the first `instance_count` uncovered matches.
pub fn allocate(table: &mut CostTable, instances: &[Instance], reserved_instances: &[ReservedInstance]) {
    let order = stable_indices(instances);
    let mut total_assigned = 0usize;

    for ri in reserved_instances {
        if !ri.is_active() {
            continue;
        }

        let mut remaining = ri.instance_count;
        if remaining == 0 {
            continue;
        }

        for &inst_idx in &order {
            if remaining == 0 {
                break;
            }
            let instance = &instances[inst_idx];
            if !matches(ri, instance) {
                continue;
            }
            let Some(cost_idx) = table.index_of(&instance.id) else {
                continue;
            };
            if table.get(cost_idx).coverage_type != CoverageType::OnDemand {
                // Already assigned by an earlier RI this pass.
                continue;
            }

            let shelf_price = table.get(cost_idx).shelf_price;
            let record = table.get_mut(cost_idx);
            record.ri_coverage = shelf_price;
            record.effective_cost = 0.0;
            record.on_demand_cost = 0.0;
            record.coverage_type = CoverageType::ReservedInstance;

            remaining -= 1;
            total_assigned += 1;
        }
        // Unutilized remainder produces no output — not an error.
    }

    if total_assigned > 0 {
        info!(total_assigned, "RI coverage assigned");
    }
}
