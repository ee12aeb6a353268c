//! Engine thresholds and the immutable per-run context

use crate::catalog::{PricingTables, StorageClass, TierCatalog};
use crate::error::{AdvisorError, Result};
use crate::models::ResourceDescriptor;
use serde::{Deserialize, Serialize};

/// Region used for pricing: each resource's own, or one fixed override
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegionSelection {
    #[default]
    Auto,
    Fixed(String),
}

impl RegionSelection {
    /// Region to price `resource` in
    pub fn region_for<'a>(&'a self, resource: &'a ResourceDescriptor) -> &'a str {
        match self {
            RegionSelection::Auto => &resource.region,
            RegionSelection::Fixed(region) => region,
        }
    }
}

impl From<String> for RegionSelection {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            RegionSelection::Auto
        } else {
            RegionSelection::Fixed(trimmed.to_string())
        }
    }
}

impl From<RegionSelection> for String {
    fn from(value: RegionSelection) -> Self {
        match value {
            RegionSelection::Auto => "auto".to_string(),
            RegionSelection::Fixed(region) => region,
        }
    }
}

/// Thresholds driving the decision rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the usage analysis window
    pub window_days: u32,
    /// Baseline utilization below which a downgrade is searched for
    pub utilization_threshold_percent: f64,
    /// Storage accounts smaller than this with no traffic are decommission candidates
    pub low_usage_capacity_gb: f64,
    pub target_region: RegionSelection,
    /// Disk class that downgrades move to
    pub capacity_class: StorageClass,
    /// Monthly transactions per stored GB below which hot data should be cool
    pub hot_to_cool_max_tx_per_gb: f64,
    /// Monthly transactions per stored GB below which cool data should be cold
    pub cool_to_cold_max_tx_per_gb: f64,
    pub lifecycle_min_gb: f64,
    /// Share of hot data assumed movable by a lifecycle policy
    pub lifecycle_cool_fraction: f64,
    pub reserved_min_gb: f64,
    pub reserved_min_monthly_cost: f64,
    pub reserved_discount: f64,
    pub required_tags: Vec<String>,
    /// `key` or `key=value` entries marking a resource as critical / highly available
    pub critical_tags: Vec<String>,
    /// Resources evaluated concurrently during a run
    pub max_concurrent_resources: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            utilization_threshold_percent: 30.0,
            low_usage_capacity_gb: 10.0,
            target_region: RegionSelection::Auto,
            capacity_class: StorageClass::StandardHdd,
            hot_to_cool_max_tx_per_gb: 10.0,
            cool_to_cold_max_tx_per_gb: 1.0,
            lifecycle_min_gb: 100.0,
            lifecycle_cool_fraction: 0.3,
            reserved_min_gb: 102_400.0,
            reserved_min_monthly_cost: 1_000.0,
            reserved_discount: 0.17,
            required_tags: vec![
                "owner".to_string(),
                "environment".to_string(),
                "cost-center".to_string(),
            ],
            critical_tags: vec![
                "criticality=critical".to_string(),
                "criticality=high".to_string(),
                "ha=true".to_string(),
            ],
            max_concurrent_resources: 16,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=365).contains(&self.window_days) {
            return Err(AdvisorError::InvalidConfig(format!(
                "window_days must be within 1..=365, got {}",
                self.window_days
            )));
        }
        if !(self.utilization_threshold_percent > 0.0 && self.utilization_threshold_percent <= 100.0) {
            return Err(AdvisorError::InvalidConfig(format!(
                "utilization_threshold_percent must be within (0, 100], got {}",
                self.utilization_threshold_percent
            )));
        }
        for (name, value) in [
            ("lifecycle_cool_fraction", self.lifecycle_cool_fraction),
            ("reserved_discount", self.reserved_discount),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AdvisorError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.low_usage_capacity_gb < 0.0 || self.lifecycle_min_gb < 0.0 || self.reserved_min_gb < 0.0 {
            return Err(AdvisorError::InvalidConfig(
                "capacity thresholds must not be negative".to_string(),
            ));
        }
        if !self.capacity_class.is_block() {
            return Err(AdvisorError::InvalidConfig(format!(
                "capacity_class must be a disk class, got {}",
                self.capacity_class
            )));
        }
        if self.max_concurrent_resources == 0 {
            return Err(AdvisorError::InvalidConfig(
                "max_concurrent_resources must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a resource's tags mark it as critical or highly available
    pub fn is_critical(&self, resource: &ResourceDescriptor) -> bool {
        self.critical_tags.iter().any(|entry| match entry.split_once('=') {
            Some((key, value)) => resource
                .tag(key.trim())
                .map(|v| v.trim().eq_ignore_ascii_case(value.trim()))
                .unwrap_or(false),
            None => resource.tag(entry.trim()).is_some(),
        })
    }

    /// Required tags the resource does not carry (or carries empty)
    pub fn missing_tags(&self, resource: &ResourceDescriptor) -> Vec<String> {
        self.required_tags
            .iter()
            .filter(|key| resource.tag(key).map(|v| v.trim().is_empty()).unwrap_or(true))
            .cloned()
            .collect()
    }
}

/// Read-only inputs shared by every evaluation of a run
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub catalog: TierCatalog,
    pub pricing: PricingTables,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Validate and bundle the run inputs; fails fast on catalog or pricing bugs
    pub fn new(catalog: TierCatalog, pricing: PricingTables, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        catalog.tiers(config.capacity_class)?;
        pricing.validate(&catalog)?;
        Ok(Self {
            catalog,
            pricing,
            config,
        })
    }

    /// Built-in catalog and pricing with the given thresholds
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Self::new(TierCatalog::builtin(), PricingTables::builtin(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountDetails, ResourceDetails};
    use std::collections::BTreeMap;

    fn account_with_tags(tags: &[(&str, &str)]) -> ResourceDescriptor {
        ResourceDescriptor {
            account_id: "sub-1".to_string(),
            account_name: "Production".to_string(),
            resource_group: "rg".to_string(),
            resource_id: "/accounts/logs".to_string(),
            name: "logs".to_string(),
            region: "westeurope".to_string(),
            class: StorageClass::ObjectStorage,
            tier: Some("Hot".to_string()),
            redundancy: Default::default(),
            size_gb: 0,
            created_at: None,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            details: ResourceDetails::StorageAccount(AccountDetails {
                lifecycle_policy: false,
                https_only: true,
                allow_public_access: false,
                min_tls_version: "TLS1_2".to_string(),
            }),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
        EngineContext::with_config(EngineConfig::default()).unwrap();
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = EngineConfig {
            utilization_threshold_percent: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AdvisorError::InvalidConfig(_))));

        let config = EngineConfig {
            window_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_object_class_cannot_be_capacity_class() {
        let config = EngineConfig {
            capacity_class: StorageClass::ObjectStorage,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_region_selection_from_string() {
        assert_eq!(RegionSelection::from("auto".to_string()), RegionSelection::Auto);
        assert_eq!(RegionSelection::from(" AUTO ".to_string()), RegionSelection::Auto);
        assert_eq!(
            RegionSelection::from("westeurope".to_string()),
            RegionSelection::Fixed("westeurope".to_string())
        );

        let resource = account_with_tags(&[]);
        assert_eq!(RegionSelection::Auto.region_for(&resource), "westeurope");
        assert_eq!(
            RegionSelection::Fixed("eastus".to_string()).region_for(&resource),
            "eastus"
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"utilization_threshold_percent": 20, "target_region": "uksouth"}"#)
                .unwrap();
        assert_eq!(config.utilization_threshold_percent, 20.0);
        assert_eq!(config.target_region, RegionSelection::Fixed("uksouth".to_string()));
        assert_eq!(config.window_days, 30);
    }

    #[test]
    fn test_critical_tag_matching() {
        let config = EngineConfig::default();
        assert!(config.is_critical(&account_with_tags(&[("Criticality", "High")])));
        assert!(config.is_critical(&account_with_tags(&[("HA", "true")])));
        assert!(!config.is_critical(&account_with_tags(&[("criticality", "low")])));
        assert!(!config.is_critical(&account_with_tags(&[])));
    }

    #[test]
    fn test_missing_tags() {
        let config = EngineConfig::default();
        let missing = config.missing_tags(&account_with_tags(&[("Owner", "data"), ("environment", " ")]));
        assert_eq!(missing, vec!["environment".to_string(), "cost-center".to_string()]);
    }
}
