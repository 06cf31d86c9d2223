//! §4.5 Aggregator — sums shelf price, effective cost, and savings across
//! every emitted instance cost record.

use crate::table::CostTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    pub total_shelf_price: f64,
    pub total_estimated_cost: f64,
    pub total_savings: f64,
}

pub fn aggregate(table: &CostTable) -> Totals {
    let total_shelf_price: f64 = table.iter().map(|c| c.shelf_price).sum();
    let total_estimated_cost: f64 = table.iter().map(|c| c.effective_cost).sum();
    Totals {
        total_shelf_price,
        total_estimated_cost,
        total_savings: total_shelf_price - total_estimated_cost,
    }
}
