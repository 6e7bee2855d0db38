//! Runtime configuration
//!
//! Deserialized once at startup by whatever hosts the crate; every
//! subsystem takes its knobs from here instead of reading the
//! environment itself.

use crate::store::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub cache: CacheSettings,
    pub pipeline: PipelineConfig,
}

/// Where repositories live and how entities are named.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for persistent repositories; `None` forces volatile
    /// handles for every tenant.
    pub path: Option<PathBuf>,
    /// Namespace generated entity identifiers live under
    pub entity_namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            entity_namespace: "urn:warren:entities:".to_string(),
        }
    }
}

/// Cache eviction policy. The weights preserve the shape of the policy:
/// in-use handles are untouchable, uninitialized handles go first under
/// pressure, initialized idle handles last longer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub weight_budget: u64,
    pub weight_uninitialized: u64,
    pub weight_idle: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            weight_budget: 900,
            weight_uninitialized: 600,
            weight_idle: 200,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            weight_budget: self.weight_budget,
            weight_uninitialized: self.weight_uninitialized,
            weight_idle: self.weight_idle,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

/// Which pipeline stages are enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reject fragments whose subjects carry no type statement
    pub check_required_type: bool,
    /// Rewrite external subject identifiers to generated local keys
    pub assign_identifiers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            check_required_type: true,
            assign_identifiers: true,
        }
    }
}
