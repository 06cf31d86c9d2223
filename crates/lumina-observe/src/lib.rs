//! Structured observability for the Lumina cost allocation engine.
//!
//! Provides [`EngineMetrics`], atomic counters for calculation activity, and
//! [`MetricsExporter`], a Prometheus text-format renderer. The engine itself
//! (`lumina-pricing`) stays free of metrics concerns; callers — the CLI and,
//! in deployment, whatever schedules calculation runs — own an
//! [`EngineMetrics`] and record against it around each `calculate` call.

#![forbid(unsafe_code)]

use lumina_proto::CalculationResult;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// A thread-safe u64 counter backed by an atomic.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Atomic counters for engine calculation activity.
///
/// # Example
/// ```rust
/// # use lumina_observe::EngineMetrics;
/// let metrics = EngineMetrics::new();
/// metrics.calculations_total.inc();
/// assert_eq!(metrics.calculations_total.get(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total `calculate`/`try_calculate` invocations.
    pub calculations_total: Counter,
    /// Invocations that surfaced an invariant violation.
    pub invariant_violations_total: Counter,
    /// Total instances priced across all calculations.
    pub instances_priced_total: Counter,
    /// Total instances that ended up Reserved-Instance covered.
    pub ri_covered_total: Counter,
    /// Total instances that ended up Savings-Plan covered (either type).
    pub sp_covered_total: Counter,
    /// Total instances priced at the spot overlay.
    pub spot_priced_total: Counter,
    /// Total instances whose spot price was unavailable (estimated fallback).
    pub spot_price_misses_total: Counter,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `calculate` invocation and fold its result into the counters.
    pub fn record_calculation(&self, result: &CalculationResult) {
        self.calculations_total.inc();
        self.instances_priced_total.add(result.instance_costs.len() as u64);

        for cost in result.instance_costs.values() {
            use lumina_proto::CoverageType::*;
            match cost.coverage_type {
                ReservedInstance => self.ri_covered_total.inc(),
                Ec2InstanceSavingsPlan | ComputeSavingsPlan => self.sp_covered_total.inc(),
                Spot => {
                    self.spot_priced_total.inc();
                    if cost.spot_price == 0.0 {
                        self.spot_price_misses_total.inc();
                    }
                }
                OnDemand => {}
            }
        }

        info!(
            instances = result.instance_costs.len(),
            total_savings = result.total_savings,
            "calculation recorded"
        );
    }

    /// Record an invariant violation surfaced by a calculation attempt.
    pub fn record_invariant_violation(&self) {
        self.invariant_violations_total.inc();
        warn!("invariant violation recorded");
    }
}

/// Exports [`EngineMetrics`] in Prometheus text format.
pub struct MetricsExporter<'a> {
    metrics: &'a EngineMetrics,
    prefix: String,
}

impl<'a> MetricsExporter<'a> {
    pub fn new(metrics: &'a EngineMetrics) -> Self {
        Self { metrics, prefix: "lumina".to_string() }
    }

    pub fn with_prefix(metrics: &'a EngineMetrics, prefix: impl Into<String>) -> Self {
        Self { metrics, prefix: prefix.into() }
    }

    /// Render all counters as Prometheus text format (`# HELP`/`# TYPE`/value per metric).
    pub fn render(&self) -> String {
        let m = self.metrics;
        let mut out = String::new();
        self.write_counter(&mut out, "calculations_total", "Total calculate invocations", m.calculations_total.get());
        self.write_counter(
            &mut out,
            "invariant_violations_total",
            "Total invariant violations surfaced",
            m.invariant_violations_total.get(),
        );
        self.write_counter(
            &mut out,
            "instances_priced_total",
            "Total instances priced across all calculations",
            m.instances_priced_total.get(),
        );
        self.write_counter(&mut out, "ri_covered_total", "Total instances RI-covered", m.ri_covered_total.get());
        self.write_counter(&mut out, "sp_covered_total", "Total instances SP-covered", m.sp_covered_total.get());
        self.write_counter(&mut out, "spot_priced_total", "Total instances priced at spot overlay", m.spot_priced_total.get());
        self.write_counter(
            &mut out,
            "spot_price_misses_total",
            "Total spot instances with no market price available",
            m.spot_price_misses_total.get(),
        );
        out
    }

    fn write_counter(&self, out: &mut String, name: &str, help: &str, value: u64) {
        let prefix = &self.prefix;
        out.push_str(&format!("# HELP {prefix}_{name} {help}\n"));
        out.push_str(&format!("# TYPE {prefix}_{name} counter\n"));
        out.push_str(&format!("{prefix}_{name} {value}\n\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lumina_proto::{CoverageType, InstanceCost, PricingAccuracy};
    use std::collections::HashMap;

    fn cost(coverage_type: CoverageType, spot_price: f64) -> InstanceCost {
        InstanceCost {
            instance_id: "i-1".into(),
            instance_type: "m5.xlarge".into(),
            region: "us-west-2".into(),
            availability_zone: "us-west-2a".into(),
            account_id: "acc-1".into(),
            shelf_price: 1.0,
            effective_cost: 1.0,
            coverage_type,
            ri_coverage: 0.0,
            sp_coverage: 0.0,
            sp_arn: None,
            on_demand_cost: 1.0,
            spot_price,
            is_spot: coverage_type == CoverageType::Spot,
            pricing_accuracy: PricingAccuracy::Accurate,
        }
    }

    fn result_with(costs: Vec<InstanceCost>) -> CalculationResult {
        CalculationResult {
            instance_costs: costs.into_iter().map(|c| (c.instance_id.clone(), c)).collect(),
            savings_plan_utilization: HashMap::new(),
            total_shelf_price: 0.0,
            total_estimated_cost: 0.0,
            total_savings: 0.0,
            calculated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_calculation_counts_coverage_types() {
        let metrics = EngineMetrics::new();
        let result = result_with(vec![cost(CoverageType::ReservedInstance, 0.0), cost(CoverageType::Spot, 0.5)]);
        metrics.record_calculation(&result);
        assert_eq!(metrics.calculations_total.get(), 1);
        assert_eq!(metrics.instances_priced_total.get(), 2);
        assert_eq!(metrics.ri_covered_total.get(), 1);
        assert_eq!(metrics.spot_priced_total.get(), 1);
        assert_eq!(metrics.spot_price_misses_total.get(), 0);
    }

    #[test]
    fn test_record_calculation_counts_spot_price_miss() {
        let metrics = EngineMetrics::new();
        let result = result_with(vec![cost(CoverageType::Spot, 0.0)]);
        metrics.record_calculation(&result);
        assert_eq!(metrics.spot_price_misses_total.get(), 1);
    }

    #[test]
    fn test_metrics_exporter_prometheus_format() {
        let metrics = EngineMetrics::new();
        metrics.calculations_total.inc();
        metrics.invariant_violations_total.inc();

        let exporter = MetricsExporter::new(&metrics);
        let output = exporter.render();

        assert!(output.contains("# HELP lumina_calculations_total"));
        assert!(output.contains("# TYPE lumina_calculations_total counter"));
        assert!(output.contains("lumina_calculations_total 1"));
        assert!(output.contains("lumina_invariant_violations_total 1"));
        assert!(output.contains("lumina_ri_covered_total 0"), "zero counters must still appear");
    }

    #[test]
    fn test_metrics_exporter_custom_prefix() {
        let metrics = EngineMetrics::new();
        let exporter = MetricsExporter::with_prefix(&metrics, "myapp");
        let output = exporter.render();
        assert!(output.contains("myapp_calculations_total"));
        assert!(!output.contains("lumina_calculations_total"));
    }
}
