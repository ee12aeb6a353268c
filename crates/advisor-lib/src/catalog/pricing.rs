//! Regional pricing tables
//!
//! Disk tiers carry a flat list price in the catalog and are scaled per region.
//! Object-storage rates are keyed by (region, tier, redundancy). Regions with no
//! entry resolve to [`DEFAULT_PRICING_REGION`] and the caller is told so.

use super::{StorageClass, TierCatalog};
use crate::error::{AdvisorError, Result};
use crate::models::Redundancy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Region whose prices are used when a region has no entry
pub const DEFAULT_PRICING_REGION: &str = "eastus";

/// Transactions covered by one transaction price unit
pub const TRANSACTION_BATCH: f64 = 10_000.0;

/// Regional price multipliers relative to East US
const REGION_MULTIPLIERS: &[(&str, f64)] = &[
    ("eastus", 1.0),
    ("eastus2", 1.0),
    ("centralus", 1.0),
    ("westus2", 1.0),
    ("northeurope", 1.04),
    ("westeurope", 1.08),
    ("uksouth", 1.10),
    ("southeastasia", 1.12),
    ("japaneast", 1.15),
    ("australiaeast", 1.18),
];

/// (tier, LRS, ZRS, GRS, RA-GRS, GZRS, RA-GZRS, per 10k transactions); 0.0 = unsupported
const OBJECT_RATES: &[(&str, [f64; 6], f64)] = &[
    ("hot", [0.018, 0.0225, 0.036, 0.046, 0.0414, 0.0518], 0.0044),
    ("cool", [0.010, 0.0125, 0.020, 0.025, 0.0225, 0.0282], 0.010),
    ("cold", [0.0036, 0.0045, 0.0072, 0.009, 0.0081, 0.0101], 0.052),
    ("archive", [0.00099, 0.0, 0.00198, 0.00198, 0.0, 0.0], 0.11),
];

/// Per-GB and transaction rates of one object tier in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTierRates {
    pub per_gb: BTreeMap<Redundancy, f64>,
    pub per_10k_transactions: f64,
}

/// Immutable pricing configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTables {
    #[serde(default = "default_region")]
    pub default_region: String,
    /// Multiplier applied to per-disk catalog prices
    pub disk_region_multipliers: BTreeMap<String, f64>,
    #[serde(default = "default_zrs_multiplier")]
    pub disk_zrs_multiplier: f64,
    /// region -> lowercase tier id -> rates
    pub object_rates: BTreeMap<String, BTreeMap<String, ObjectTierRates>>,
}

fn default_region() -> String {
    DEFAULT_PRICING_REGION.to_string()
}

fn default_zrs_multiplier() -> f64 {
    1.5
}

/// Normalise "East US" / "east-us" style names to "eastus"
pub(crate) fn normalize_region(region: &str) -> String {
    region
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

impl PricingTables {
    pub fn builtin() -> Self {
        let mut disk_region_multipliers = BTreeMap::new();
        let mut object_rates = BTreeMap::new();

        for &(region, multiplier) in REGION_MULTIPLIERS {
            disk_region_multipliers.insert(region.to_string(), multiplier);

            let tiers = OBJECT_RATES
                .iter()
                .map(|&(tier, per_gb, per_10k)| {
                    let per_gb = Redundancy::all()
                        .into_iter()
                        .zip(per_gb)
                        .filter(|(_, price)| *price > 0.0)
                        .map(|(redundancy, price)| (redundancy, price * multiplier))
                        .collect();
                    let rates = ObjectTierRates {
                        per_gb,
                        per_10k_transactions: per_10k * multiplier,
                    };
                    (tier.to_string(), rates)
                })
                .collect();
            object_rates.insert(region.to_string(), tiers);
        }

        Self {
            default_region: default_region(),
            disk_region_multipliers,
            disk_zrs_multiplier: default_zrs_multiplier(),
            object_rates,
        }
    }

    /// Parse pricing tables from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AdvisorError::InvalidPricing(e.to_string()))
    }

    /// Check that every key the cost model may need is present
    pub fn validate(&self, catalog: &TierCatalog) -> Result<()> {
        let default = normalize_region(&self.default_region);

        let multiplier = self
            .disk_region_multipliers
            .get(&default)
            .ok_or_else(|| {
                AdvisorError::MissingPricing(format!("disk multiplier for default region '{}'", default))
            })?;
        if *multiplier <= 0.0 || self.disk_zrs_multiplier <= 0.0 {
            return Err(AdvisorError::InvalidPricing(
                "disk multipliers must be positive".to_string(),
            ));
        }

        if let Ok(tiers) = catalog.tiers(StorageClass::ObjectStorage) {
            let regional = self.object_rates.get(&default).ok_or_else(|| {
                AdvisorError::MissingPricing(format!("object rates for default region '{}'", default))
            })?;
            for tier in tiers {
                let rates = regional
                    .get(&tier.id.to_ascii_lowercase())
                    .ok_or_else(|| {
                        AdvisorError::MissingPricing(format!(
                            "object rates for tier '{}' in '{}'",
                            tier.id, default
                        ))
                    })?;
                if !rates.per_gb.contains_key(&Redundancy::Lrs) {
                    return Err(AdvisorError::MissingPricing(format!(
                        "LRS rate for tier '{}' in '{}'",
                        tier.id, default
                    )));
                }
            }
        }

        Ok(())
    }

    /// Disk price multiplier for a region; the flag is true when the default region was used
    pub fn disk_multiplier(&self, region: &str) -> Result<(f64, bool)> {
        if let Some(m) = self.disk_region_multipliers.get(&normalize_region(region)) {
            return Ok((*m, false));
        }
        let default = normalize_region(&self.default_region);
        self.disk_region_multipliers
            .get(&default)
            .map(|m| (*m, true))
            .ok_or_else(|| AdvisorError::MissingPricing(format!("disk multiplier for '{}'", default)))
    }

    /// Object-tier rates for a region; the flag is true when the default region was used
    pub fn object_rates(&self, region: &str, tier_id: &str) -> Result<(&ObjectTierRates, bool)> {
        let tier = tier_id.to_ascii_lowercase();
        if let Some(rates) = self
            .object_rates
            .get(&normalize_region(region))
            .and_then(|tiers| tiers.get(&tier))
        {
            return Ok((rates, false));
        }
        let default = normalize_region(&self.default_region);
        self.object_rates
            .get(&default)
            .and_then(|tiers| tiers.get(&tier))
            .map(|rates| (rates, true))
            .ok_or_else(|| {
                AdvisorError::MissingPricing(format!("object rates for tier '{}' in '{}'", tier_id, default))
            })
    }
}

impl Default for PricingTables {
    fn default() -> Self {
        Self::builtin()
    }
}
