//! Domain types shared by every Lumina crate.
//!
//! Defines the instances, discount instruments, and cost records that flow
//! through the allocation engine in `lumina-pricing`. No allocation logic
//! lives here — only the wire shapes and the handful of pure lookups (family,
//! product description, OS normalization) that both sides of the engine
//! need to agree on.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Instance state / lifecycle / tenancy ─────────────────────────────────────

/// Only `Running` instances are priced; every other reported state is
/// collapsed into `Other` since the engine treats them identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Running,
    #[serde(other)]
    Other,
}

impl From<&str> for InstanceState {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("running") {
            Self::Running
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    OnDemand,
    Spot,
}

impl From<&str> for Lifecycle {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("spot") {
            Self::Spot
        } else {
            Self::OnDemand
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tenancy {
    #[default]
    Default,
    Dedicated,
}

/// Only `Active` Reserved Instances are honored by the RI allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservedInstanceState {
    Active,
    #[serde(other)]
    Other,
}

impl From<&str> for ReservedInstanceState {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Other
        }
    }
}

/// Sentinel availability-zone value meaning "regional, any zone in `region`".
pub const REGIONAL_SENTINEL: &str = "regional";

// ─── Savings Plan kind ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsPlanType {
    Ec2Instance,
    Compute,
}

impl std::fmt::Display for SavingsPlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ec2Instance => write!(f, "EC2Instance"),
            Self::Compute => write!(f, "Compute"),
        }
    }
}

// ─── Coverage type (stable metric-label constants, §6) ────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    OnDemand,
    ReservedInstance,
    Ec2InstanceSavingsPlan,
    ComputeSavingsPlan,
    Spot,
}

impl std::fmt::Display for CoverageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OnDemand => "on_demand",
            Self::ReservedInstance => "reserved_instance",
            Self::Ec2InstanceSavingsPlan => "ec2_instance_savings_plan",
            Self::ComputeSavingsPlan => "compute_savings_plan",
            Self::Spot => "spot",
        };
        write!(f, "{s}")
    }
}

impl From<SavingsPlanType> for CoverageType {
    fn from(t: SavingsPlanType) -> Self {
        match t {
            SavingsPlanType::Ec2Instance => Self::Ec2InstanceSavingsPlan,
            SavingsPlanType::Compute => Self::ComputeSavingsPlan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingAccuracy {
    Accurate,
    Estimated,
}

// ─── Instance ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub instance_type: String,
    pub region: String,
    pub availability_zone: String,
    pub account_id: String,
    pub state: InstanceState,
    pub lifecycle: Lifecycle,
    pub platform: String,
    #[serde(default)]
    pub tenancy: Tenancy,
    pub launch_time: DateTime<Utc>,
}

impl Instance {
    /// The text before the first `.` in `instance_type` (e.g. `m5` in `m5.2xlarge`).
    pub fn family(&self) -> &str {
        family(&self.instance_type)
    }

    pub fn is_running(&self) -> bool {
        self.state == InstanceState::Running
    }

    pub fn is_spot(&self) -> bool {
        self.lifecycle == Lifecycle::Spot
    }
}

/// The text before the first `.` in an instance-type identifier.
pub fn family(instance_type: &str) -> &str {
    instance_type.split('.').next().unwrap_or(instance_type)
}

// ─── ReservedInstance ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedInstance {
    pub id: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub account_id: String,
    pub region: String,
    /// Empty string or `"regional"` ⇒ regional RI; anything else ⇒ zonal.
    #[serde(default)]
    pub availability_zone: String,
    pub state: ReservedInstanceState,
    pub platform: String,
}

impl ReservedInstance {
    pub fn is_regional(&self) -> bool {
        self.availability_zone.is_empty() || self.availability_zone == REGIONAL_SENTINEL
    }

    pub fn is_active(&self) -> bool {
        self.state == ReservedInstanceState::Active
    }
}

// ─── SavingsPlan ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsPlan {
    pub arn: String,
    pub account_id: String,
    #[serde(rename = "type")]
    pub plan_type: SavingsPlanType,
    pub commitment: f64,
    /// `"all"`/`""` for Compute; a specific region for EC2-Instance.
    #[serde(default)]
    pub region: String,
    /// `"all"`/`""` for Compute; a specific family for EC2-Instance.
    #[serde(default)]
    pub instance_family: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ─── On-demand price table ─────────────────────────────────────────────────────

/// Keyed by `(instance_type, region)`; values must be positive.
pub type OnDemandPriceTable = HashMap<(String, String), f64>;

pub fn on_demand_price(table: &OnDemandPriceTable, instance_type: &str, region: &str) -> Option<f64> {
    table
        .get(&(instance_type.to_string(), region.to_string()))
        .copied()
        .filter(|p| *p > 0.0)
}

// ─── Platform → product_description / OS normalization (§6) ──────────────────

/// Maps `platform` to the spot-price product description, case- and
/// whitespace-insensitive. Defaults to `"Linux/UNIX"`.
pub fn product_description(platform: &str) -> &'static str {
    match platform.trim().to_lowercase().as_str() {
        "windows" => "Windows",
        _ => "Linux/UNIX",
    }
}

/// Maps `platform` to the OS tag used in SP rate lookups.
/// Empty ⇒ `"linux"`; otherwise the lowercased value.
pub fn normalized_os(platform: &str) -> String {
    if platform.is_empty() {
        "linux".to_string()
    } else {
        platform.to_lowercase()
    }
}

// ─── InstanceCost (produced) ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceCost {
    pub instance_id: String,
    pub instance_type: String,
    pub region: String,
    pub availability_zone: String,
    pub account_id: String,

    pub shelf_price: f64,
    pub effective_cost: f64,
    pub coverage_type: CoverageType,

    pub ri_coverage: f64,
    pub sp_coverage: f64,
    pub sp_arn: Option<String>,
    pub on_demand_cost: f64,

    pub spot_price: f64,
    pub is_spot: bool,

    pub pricing_accuracy: PricingAccuracy,
}

// ─── SavingsPlanUtilization (produced) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsPlanUtilization {
    pub arn: String,
    pub hourly_commitment: f64,
    pub current_utilization_rate: f64,
    pub remaining_capacity: f64,
    pub utilization_percent: f64,
    pub remaining_hours: f64,
    pub end: DateTime<Utc>,
}

// ─── Inputs / outputs of a single Calculate call ──────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalculationInputs {
    pub instances: Vec<Instance>,
    pub reserved_instances: Vec<ReservedInstance>,
    pub savings_plans: Vec<SavingsPlan>,
    pub on_demand_prices: OnDemandPriceTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub instance_costs: HashMap<String, InstanceCost>,
    pub savings_plan_utilization: HashMap<String, SavingsPlanUtilization>,
    pub total_shelf_price: f64,
    pub total_estimated_cost: f64,
    pub total_savings: f64,
    /// Wallclock timestamp stamped at call time — informational, ignore in tests.
    pub calculated_at: DateTime<Utc>,
}

// ─── Validation ────────────────────────────────────────────────────────────────

/// Validate an instance ID format.
pub fn validate_instance_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Validate an account ID format.
pub fn validate_account_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64
}
