//! Optional collaborator capabilities the engine reads synchronously.
//!
//! Both readers and the discount-config reader may be absent — callers
//! without a live pricing API pass the `No*`/`Default*` implementations
//! below and the engine falls back per §4.3/§4.4 of the specification.

use lumina_proto::Tenancy;

/// `(instance_type, availability_zone, product_description) → price`.
pub trait SpotPriceReader {
    fn spot_price(&self, instance_type: &str, availability_zone: &str, product_description: &str) -> Option<f64>;
}

/// Always reports "not found" — triggers the estimated-zero spot fallback.
pub struct NoSpotPrices;

impl SpotPriceReader for NoSpotPrices {
    fn spot_price(&self, _instance_type: &str, _availability_zone: &str, _product_description: &str) -> Option<f64> {
        None
    }
}

/// `(sp_arn, instance_type, region, tenancy, os) → per-instance rate`.
pub trait SpRateReader {
    fn sp_rate(&self, arn: &str, instance_type: &str, region: &str, tenancy: Tenancy, os: &str) -> Option<f64>;
}

/// Always reports "not found" — triggers the `shelf_price * discount_multiplier` fallback.
pub struct NoSpRates;

impl SpRateReader for NoSpRates {
    fn sp_rate(&self, _arn: &str, _instance_type: &str, _region: &str, _tenancy: Tenancy, _os: &str) -> Option<f64> {
        None
    }
}

/// Supplies the fallback discount multipliers used when `SpRateReader` misses.
pub trait DiscountConfig {
    fn ec2_instance_discount(&self) -> f64;
    fn compute_discount(&self) -> f64;
}

/// The documented defaults: a 28% discount for both SP types.
pub struct DefaultDiscountConfig;

impl DiscountConfig for DefaultDiscountConfig {
    fn ec2_instance_discount(&self) -> f64 {
        0.72
    }

    fn compute_discount(&self) -> f64 {
        0.72
    }
}
