//! Command implementations for the `lumina` binary.

use crate::error::{CliError, CliResult};
use lumina_config::{ConfigStore, EngineConfig};
use lumina_observe::{EngineMetrics, MetricsExporter};
use lumina_pricing::{DefaultDiscountConfig, NoSpRates, NoSpotPrices};
use lumina_proto::CalculationInputs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load a [`CalculationInputs`] fixture from a JSON file on disk.
///
/// Fixtures are plain JSON serializations of `CalculationInputs` — the same
/// shape a pricing-data collector would hand the engine in a long-running
/// deployment. There is no live AWS integration here (§ non-goals); this is
/// the offline, reproducible entry point.
pub fn load_fixture(path: &Path) -> CliResult<CalculationInputs> {
    let content = std::fs::read_to_string(path)?;
    let inputs: CalculationInputs = serde_json::from_str(&content)?;
    Ok(inputs)
}

/// Run a calculation against a fixture file, using the engine config stored
/// at `state_path` for SP discount fallbacks. No live spot-price or SP-rate
/// feed is wired up here — both always miss, which is a legitimate and
/// fully-specified mode of operation (§9).
pub fn run_calculate(fixture: &Path, state_path: &Path, metrics: &EngineMetrics) -> CliResult<serde_json::Value> {
    let inputs = load_fixture(fixture)?;
    let store = ConfigStore::new(state_path);
    let discount_config = EngineConfig::from_store(&store);

    info!(fixture = %fixture.display(), instances = inputs.instances.len(), "running calculation");

    let result = lumina_pricing::try_calculate(&inputs, &NoSpotPrices, &NoSpRates, &discount_config)?;
    metrics.record_calculation(&result);

    Ok(serde_json::to_value(&result)?)
}

/// Render current metrics in Prometheus text format.
pub fn render_metrics(metrics: &EngineMetrics) -> String {
    MetricsExporter::new(metrics).render()
}

/// `config get <name>`.
pub fn config_get(state_path: &Path, name: &str) -> CliResult<serde_json::Value> {
    let store = ConfigStore::new(state_path);
    match store.get(name) {
        Some(entry) => Ok(serde_json::json!({
            "ok": true,
            "name": name,
            "data": entry.data,
            "immutable": entry.immutable,
            "updated_at": entry.updated_at,
        })),
        None => Ok(serde_json::json!({ "ok": false, "error": "config not found" })),
    }
}

/// `config set-discounts <ec2_instance> <compute>` — writes the reserved
/// `"engine"` entry the pipeline reads its discount fallback from.
pub fn config_set_discounts(state_path: &Path, ec2_instance: f64, compute: f64) -> CliResult<()> {
    let mut store = ConfigStore::new(state_path);
    EngineConfig::set(&mut store, ec2_instance, compute).map_err(|e| CliError::Config(e.to_string()))
}

/// `config list [prefix]`.
pub fn config_list(state_path: &Path, prefix: Option<&str>) -> CliResult<serde_json::Value> {
    let store = ConfigStore::new(state_path);
    let entries = store.list(prefix);
    Ok(serde_json::json!({
        "ok": true,
        "configs": entries.iter().map(|(name, entry)| serde_json::json!({
            "name": name,
            "immutable": entry.immutable,
            "keys": entry.data.keys().collect::<Vec<_>>(),
            "updated_at": entry.updated_at,
        })).collect::<Vec<_>>(),
    }))
}

pub fn resolve_state_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(crate::config::default_state_path)
}
