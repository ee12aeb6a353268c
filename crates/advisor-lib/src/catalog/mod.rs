//! Tier catalog
//!
//! Static lookup tables mapping a tier id to its capacity, performance and
//! price attributes. Tiers are grouped by storage class and kept in ascending
//! capacity order so size-based lookups are a forward scan.

mod builtin;
mod pricing;

pub use pricing::{ObjectTierRates, PricingTables, DEFAULT_PRICING_REGION, TRANSACTION_BATCH};
pub(crate) use pricing::normalize_region;

use crate::error::{AdvisorError, Result};
use crate::models::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Purchasable storage class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    PremiumSsd,
    StandardSsd,
    StandardHdd,
    ObjectStorage,
}

impl StorageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::PremiumSsd => "premium_ssd",
            StorageClass::StandardSsd => "standard_ssd",
            StorageClass::StandardHdd => "standard_hdd",
            StorageClass::ObjectStorage => "object_storage",
        }
    }

    pub fn is_block(&self) -> bool {
        !matches!(self, StorageClass::ObjectStorage)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "premium_ssd" | "premium" => Ok(StorageClass::PremiumSsd),
            "standard_ssd" => Ok(StorageClass::StandardSsd),
            "standard_hdd" | "standard" => Ok(StorageClass::StandardHdd),
            "object_storage" | "object" => Ok(StorageClass::ObjectStorage),
            other => Err(format!("unknown storage class '{}'", other)),
        }
    }
}

/// How a tier's unit price is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    /// Flat monthly price per provisioned disk
    PerDisk,
    /// Monthly price per stored GB
    PerGb,
}

/// One selectable tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub id: String,
    pub class: StorageClass,
    pub capacity_gb: u64,
    /// Sustained IOPS (transactions/s for object tiers)
    pub baseline_iops: u32,
    pub baseline_throughput_mbps: u32,
    /// Equal to baseline for tiers without bursting
    pub burst_iops: u32,
    pub burst_throughput_mbps: u32,
    /// Monthly list price in the default pricing region
    pub unit_price: f64,
    pub price_unit: PriceUnit,
}

impl TierSpec {
    pub fn has_burst(&self) -> bool {
        self.burst_iops > self.baseline_iops || self.burst_throughput_mbps > self.baseline_throughput_mbps
    }

    /// Whether this tier can carry the given size and peak demand
    pub fn accommodates(&self, size_gb: u64, peak_iops: f64, peak_throughput_mbps: f64) -> bool {
        self.capacity_gb >= size_gb
            && self.baseline_iops as f64 >= peak_iops
            && self.baseline_throughput_mbps as f64 >= peak_throughput_mbps
    }
}

/// Tier id to attributes, per storage class
#[derive(Debug, Clone)]
pub struct TierCatalog {
    classes: BTreeMap<StorageClass, Vec<TierSpec>>,
}

impl TierCatalog {
    /// Build a catalog, rejecting duplicate tier ids
    pub fn new(tiers: Vec<TierSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for tier in &tiers {
            if !seen.insert(tier.id.to_ascii_lowercase()) {
                return Err(AdvisorError::DuplicateTier(tier.id.clone()));
            }
        }
        Ok(Self::grouped(tiers))
    }

    /// Catalog with the built-in disk and object-storage tables
    pub fn builtin() -> Self {
        Self::grouped(builtin::tiers())
    }

    fn grouped(tiers: Vec<TierSpec>) -> Self {
        let mut classes: BTreeMap<StorageClass, Vec<TierSpec>> = BTreeMap::new();
        for tier in tiers {
            classes.entry(tier.class).or_default().push(tier);
        }
        // Stable sort keeps declaration order among equal capacities
        for tiers in classes.values_mut() {
            tiers.sort_by_key(|t| t.capacity_gb);
        }
        Self { classes }
    }

    /// Tiers of a class in ascending capacity order
    pub fn tiers(&self, class: StorageClass) -> Result<&[TierSpec]> {
        self.classes
            .get(&class)
            .filter(|tiers| !tiers.is_empty())
            .map(|tiers| tiers.as_slice())
            .ok_or(AdvisorError::UnknownClass(class))
    }

    pub fn classes(&self) -> impl Iterator<Item = StorageClass> + '_ {
        self.classes.keys().copied()
    }

    /// Smallest tier whose capacity covers `size_gb`, or the largest tier on overflow
    pub fn tier_for(&self, size_gb: u64, class: StorageClass) -> Result<&TierSpec> {
        let tiers = self.tiers(class)?;
        let tier = tiers
            .iter()
            .find(|t| t.capacity_gb >= size_gb)
            .or_else(|| tiers.last())
            .ok_or(AdvisorError::UnknownClass(class))?;
        Ok(tier)
    }

    /// Attributes of a tier id (case-insensitive)
    pub fn spec_of(&self, tier_id: &str) -> Result<&TierSpec> {
        self.classes
            .values()
            .flatten()
            .find(|t| t.id.eq_ignore_ascii_case(tier_id))
            .ok_or_else(|| AdvisorError::UnknownTier(tier_id.to_string()))
    }

    /// Tier a resource currently occupies: its explicit tier, else derived from size
    pub fn current_tier(&self, resource: &ResourceDescriptor) -> Result<&TierSpec> {
        match &resource.tier {
            Some(id) => self.spec_of(id),
            None => self.tier_for(resource.size_gb, resource.class),
        }
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_has_unique_ids() {
        assert!(TierCatalog::new(builtin::tiers()).is_ok());
    }

    #[test]
    fn test_duplicate_tier_rejected() {
        let mut tiers = builtin::tiers();
        let mut dup = tiers[0].clone();
        dup.id = dup.id.to_ascii_lowercase();
        tiers.push(dup);

        assert!(matches!(
            TierCatalog::new(tiers),
            Err(AdvisorError::DuplicateTier(_))
        ));
    }

    #[test]
    fn test_tier_for_picks_smallest_covering_tier() {
        let catalog = TierCatalog::builtin();

        assert_eq!(catalog.tier_for(100, StorageClass::PremiumSsd).unwrap().id, "P10");
        assert_eq!(catalog.tier_for(128, StorageClass::PremiumSsd).unwrap().id, "P10");
        assert_eq!(catalog.tier_for(129, StorageClass::PremiumSsd).unwrap().id, "P15");
        assert_eq!(catalog.tier_for(512, StorageClass::StandardHdd).unwrap().id, "S20");
    }

    #[test]
    fn test_tier_for_overflow_returns_largest() {
        let catalog = TierCatalog::builtin();
        let tier = catalog.tier_for(100_000, StorageClass::PremiumSsd).unwrap();
        assert_eq!(tier.id, "P80");
    }

    #[test]
    fn test_tier_lookup_is_monotonic() {
        let catalog = TierCatalog::builtin();
        for class in catalog.classes().collect::<Vec<_>>() {
            let mut previous = 0;
            for size in (0..40_000).step_by(97) {
                let capacity = catalog.tier_for(size, class).unwrap().capacity_gb;
                assert!(capacity >= previous, "{} shrank at {} GB", class, size);
                previous = capacity;
            }
        }
    }

    #[test]
    fn test_premium_burst_collapses_above_breakpoint() {
        let catalog = TierCatalog::builtin();

        let p20 = catalog.spec_of("P20").unwrap();
        assert!(p20.has_burst());
        assert_eq!(p20.burst_iops, 3500);

        let p30 = catalog.spec_of("p30").unwrap();
        assert!(!p30.has_burst());
        assert_eq!(p30.burst_iops, p30.baseline_iops);
    }

    #[test]
    fn test_unknown_tier_is_an_error() {
        let catalog = TierCatalog::builtin();
        assert!(matches!(
            catalog.spec_of("U9000"),
            Err(AdvisorError::UnknownTier(_))
        ));
    }

    #[test]
    fn test_missing_class_is_an_error() {
        let catalog = TierCatalog::new(vec![]).unwrap();
        assert!(matches!(
            catalog.tier_for(10, StorageClass::StandardHdd),
            Err(AdvisorError::UnknownClass(StorageClass::StandardHdd))
        ));
    }

    #[test]
    fn test_storage_class_parse() {
        assert_eq!("Premium_SSD".parse::<StorageClass>().unwrap(), StorageClass::PremiumSsd);
        assert_eq!("standard-hdd".parse::<StorageClass>().unwrap(), StorageClass::StandardHdd);
        assert!("ultra".parse::<StorageClass>().is_err());
    }
}
