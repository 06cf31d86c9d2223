//! The cost table: an ordered sequence of [`InstanceCost`] records plus a
//! secondary `instance_id → index` map (§9 re-architected-patterns note).
//!
//! Every pipeline stage after the Initializer mutates records **by index**
//! rather than handing out references that would outlive the stage — this
//! keeps the borrow checker honest about "one step owns the table at a
//! time" and avoids accidentally aliasing a record across two allocators.

use lumina_proto::InstanceCost;
use std::collections::HashMap;

pub struct CostTable {
    records: Vec<InstanceCost>,
    index: HashMap<String, usize>,
}

impl CostTable {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn push(&mut self, cost: InstanceCost) {
        let idx = self.records.len();
        self.index.insert(cost.instance_id.clone(), idx);
        self.records.push(cost);
    }

    pub fn index_of(&self, instance_id: &str) -> Option<usize> {
        self.index.get(instance_id).copied()
    }

    pub fn get(&self, idx: usize) -> &InstanceCost {
        &self.records[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut InstanceCost {
        &mut self.records[idx]
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.index.contains_key(instance_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceCost> {
        self.records.iter()
    }

    /// Consume the table, handing back a `instance_id → InstanceCost` map for
    /// the final [`crate::CalculationResult`].
    pub fn into_map(self) -> HashMap<String, InstanceCost> {
        self.records
            .into_iter()
            .map(|c| (c.instance_id.clone(), c))
            .collect()
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self::new()
    }
}
