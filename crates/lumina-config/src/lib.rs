//! Configuration store for the Lumina controller.
//!
//! Provides a generic key-value [`ConfigStore`] backed by
//! [`lumina_persist::JsonStore`], plus [`EngineConfig`] — a thin view over a
//! single reserved entry (`"engine"`) supplying the discount multipliers the
//! allocation engine falls back to when no live SP-rate feed is attached
//! (`lumina_pricing::DiscountConfig`).

#![forbid(unsafe_code)]

use lumina_persist::JsonStore;
use lumina_pricing::DiscountConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config '{0}' already exists")]
    AlreadyExists(String),
    #[error("config '{0}' not found")]
    NotFound(String),
    #[error("config '{0}' is immutable")]
    Immutable(String),
    #[error("discount value {value} for '{key}' is out of range [0, 1]")]
    InvalidDiscount { key: String, value: f64 },
}

/// A configuration entry (plain key-value data, no encryption).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub data: HashMap<String, String>,
    pub immutable: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// In-memory config store backed by JSON snapshots.
pub struct ConfigStore {
    configs: HashMap<String, ConfigEntry>,
    store: JsonStore,
}

impl ConfigStore {
    pub fn new(state_path: &Path) -> Self {
        let store = JsonStore::new(state_path, "configs");
        let configs = store.load();
        debug!(count = configs.len(), "loaded configs from disk");
        Self { configs, store }
    }

    pub fn create(&mut self, name: String, data: HashMap<String, String>, immutable: bool) -> Result<(), ConfigError> {
        if self.configs.contains_key(&name) {
            return Err(ConfigError::AlreadyExists(name));
        }
        let now = chrono::Utc::now();
        self.configs.insert(
            name,
            ConfigEntry {
                data,
                immutable,
                created_at: now,
                updated_at: now,
            },
        );
        self.snapshot();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.configs.get(name)
    }

    pub fn update(&mut self, name: &str, data: HashMap<String, String>) -> Result<(), ConfigError> {
        let entry = self
            .configs
            .get_mut(name)
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
        if entry.immutable {
            return Err(ConfigError::Immutable(name.to_string()));
        }
        entry.data = data;
        entry.updated_at = chrono::Utc::now();
        self.snapshot();
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.configs.remove(name).is_none() {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        self.snapshot();
        Ok(())
    }

    pub fn list(&self, prefix: Option<&str>) -> Vec<(&str, &ConfigEntry)> {
        self.configs
            .iter()
            .filter(|(k, _)| prefix.is_none() || k.starts_with(prefix.unwrap_or("")))
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    fn snapshot(&self) {
        if let Err(e) = self.store.save(&self.configs) {
            warn!(error = %e, "failed to snapshot config store");
        }
    }
}

const ENGINE_ENTRY: &str = "engine";
const EC2_INSTANCE_DISCOUNT_KEY: &str = "ec2_instance_discount";
const COMPUTE_DISCOUNT_KEY: &str = "compute_discount";
const DEFAULT_DISCOUNT: f64 = 0.72;

/// Discount multipliers read from the reserved `"engine"` config entry, with
/// the documented 28%-off default for either SP type when unset.
///
/// Wraps a snapshot of the two discount values rather than borrowing
/// `ConfigStore` directly, so it can be handed to `lumina_pricing::calculate`
/// as a `&dyn DiscountConfig` without holding the store's lock for the
/// duration of a calculation.
pub struct EngineConfig {
    ec2_instance_discount: f64,
    compute_discount: f64,
}

impl EngineConfig {
    /// Read discount multipliers from `store`'s `"engine"` entry, falling
    /// back to defaults for keys that are absent, unparseable, or out of
    /// `[0, 1]`.
    pub fn from_store(store: &ConfigStore) -> Self {
        let data = store.get(ENGINE_ENTRY).map(|e| &e.data);
        let read = |key: &str| -> f64 {
            data.and_then(|d| d.get(key))
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(DEFAULT_DISCOUNT)
        };
        Self {
            ec2_instance_discount: read(EC2_INSTANCE_DISCOUNT_KEY),
            compute_discount: read(COMPUTE_DISCOUNT_KEY),
        }
    }

    /// Validate and write discount multipliers into `store`'s `"engine"`
    /// entry, creating it if absent.
    pub fn set(
        store: &mut ConfigStore,
        ec2_instance_discount: f64,
        compute_discount: f64,
    ) -> Result<(), ConfigError> {
        for (key, value) in [
            (EC2_INSTANCE_DISCOUNT_KEY, ec2_instance_discount),
            (COMPUTE_DISCOUNT_KEY, compute_discount),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidDiscount { key: key.to_string(), value });
            }
        }
        let mut data = HashMap::new();
        data.insert(EC2_INSTANCE_DISCOUNT_KEY.to_string(), ec2_instance_discount.to_string());
        data.insert(COMPUTE_DISCOUNT_KEY.to_string(), compute_discount.to_string());

        if store.get(ENGINE_ENTRY).is_some() {
            store.update(ENGINE_ENTRY, data)
        } else {
            store.create(ENGINE_ENTRY.to_string(), data, false)
        }
    }
}

impl DiscountConfig for EngineConfig {
    fn ec2_instance_discount(&self) -> f64 {
        self.ec2_instance_discount
    }

    fn compute_discount(&self) -> f64 {
        self.compute_discount
    }
}
