//! Service configuration

use advisor_lib::catalog::{PricingTables, TierCatalog};
use advisor_lib::providers::RetryPolicy;
use advisor_lib::{EngineConfig, EngineContext};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file consulted when `ADVISOR_CONFIG` is unset (any supported extension)
pub const DEFAULT_CONFIG_NAME: &str = "storage-advisor";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port for health, metrics and reports
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Inventory snapshot analyzed on every run
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,

    /// Pricing tables replacing the built-in ones
    #[serde(default)]
    pub pricing_path: Option<PathBuf>,

    /// Seconds between analysis runs
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "storage-advisor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("/etc/storage-advisor/inventory.json")
}

fn default_interval() -> u64 {
    3600
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            api_port: default_api_port(),
            inventory_path: default_inventory_path(),
            pricing_path: None,
            interval_secs: default_interval(),
            engine: EngineConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AdvisorConfig {
    /// Load from the optional config file, overridden by `ADVISOR_*` environment variables
    pub fn load() -> Result<Self> {
        let name = std::env::var("ADVISOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_NAME.to_string());
        Self::load_from(&name)
    }

    pub fn load_from(name: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(
                config::Environment::with_prefix("ADVISOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid storage advisor configuration")
    }

    /// Validated engine context with the built-in catalog and configured pricing
    pub fn engine_context(&self) -> Result<EngineContext> {
        let pricing = match &self.pricing_path {
            Some(path) => load_pricing(path)?,
            None => PricingTables::builtin(),
        };
        EngineContext::new(TierCatalog::builtin(), pricing, self.engine.clone())
            .context("Invalid engine configuration")
    }
}

fn load_pricing(path: &Path) -> Result<PricingTables> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pricing tables {}", path.display()))?;
    PricingTables::from_json(&json)
        .with_context(|| format!("Invalid pricing tables {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_lib::RegionSelection;
    use tempfile::TempDir;

    #[test]
    fn test_file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("advisor.toml");
        std::fs::write(
            &path,
            r#"
api_port = 9191
inventory_path = "/data/inventory.json"
interval_secs = 600

[engine]
utilization_threshold_percent = 25
target_region = "westeurope"

[retry]
max_attempts = 5
"#,
        )
        .unwrap();

        let config = AdvisorConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.api_port, 9191);
        assert_eq!(config.interval_secs, 600);
        assert_eq!(config.inventory_path, PathBuf::from("/data/inventory.json"));
        assert_eq!(config.engine.utilization_threshold_percent, 25.0);
        assert_eq!(
            config.engine.target_region,
            RegionSelection::Fixed("westeurope".to_string())
        );
        assert_eq!(config.engine.window_days, 30);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, RetryPolicy::default().initial_backoff_ms);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let name = dir.path().join("absent");
        let config = AdvisorConfig::load_from(name.to_str().unwrap()).unwrap();

        assert_eq!(config.api_port, 8080);
        assert!(config.pricing_path.is_none());
        config.engine_context().unwrap();
    }

    #[test]
    fn test_invalid_engine_threshold_is_rejected() {
        let config = AdvisorConfig {
            engine: EngineConfig {
                utilization_threshold_percent: 150.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.engine_context().unwrap_err();
        assert!(format!("{:#}", err).contains("utilization_threshold_percent"));
    }

    #[test]
    fn test_pricing_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pricing.json");
        let mut pricing = PricingTables::builtin();
        pricing.disk_zrs_multiplier = 1.25;
        std::fs::write(&path, serde_json::to_string(&pricing).unwrap()).unwrap();

        let config = AdvisorConfig {
            pricing_path: Some(path),
            ..Default::default()
        };
        let context = config.engine_context().unwrap();
        assert_eq!(context.pricing.disk_zrs_multiplier, 1.25);
    }
}
