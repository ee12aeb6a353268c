//! Cost model
//!
//! Prices a (tier, size, redundancy, region, transactions) state as a monthly
//! amount. Used for both the current state of a resource and every candidate
//! state the decision rules consider.

use crate::catalog::{normalize_region, PriceUnit, PricingTables, TierCatalog, TierSpec, TRANSACTION_BATCH};
use crate::config::EngineContext;
use crate::error::{AdvisorError, Result};
use crate::models::Redundancy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Projected monthly cost of one storage state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostQuote {
    pub monthly_cost: f64,
    pub storage_cost: f64,
    pub transaction_cost: f64,
    /// Region whose prices were applied
    pub pricing_region: String,
    /// True when the requested region had no prices and the default was used
    pub fallback_region: bool,
}

/// What to price
#[derive(Debug, Clone, Copy)]
pub struct CostInput<'a> {
    pub tier_id: &'a str,
    pub size_gb: f64,
    /// Transactions per month; only meaningful for per-GB tiers
    pub transactions: u64,
    pub region: &'a str,
    pub redundancy: Redundancy,
}

/// Prices storage states against the catalog and regional tables
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'a> {
    catalog: &'a TierCatalog,
    pricing: &'a PricingTables,
}

impl<'a> CostModel<'a> {
    pub fn new(context: &'a EngineContext) -> Self {
        Self::from_parts(&context.catalog, &context.pricing)
    }

    pub fn from_parts(catalog: &'a TierCatalog, pricing: &'a PricingTables) -> Self {
        Self { catalog, pricing }
    }

    /// Monthly cost of a tier; unknown tiers are an error, unknown regions fall back
    ///
    /// A fallback is only flagged on the quote and logged at debug, since one
    /// resource is quoted once per candidate tier. Callers that report to
    /// operators warn once per resource from `CostQuote::fallback_region`; the
    /// analyzer does this as the `pricing_fallback` event.
    pub fn cost_of(&self, input: CostInput<'_>) -> Result<CostQuote> {
        let tier = self.catalog.spec_of(input.tier_id)?;
        self.cost_of_spec(tier, input)
    }

    pub fn cost_of_spec(&self, tier: &TierSpec, input: CostInput<'_>) -> Result<CostQuote> {
        let quote = match tier.price_unit {
            PriceUnit::PerDisk => {
                let (multiplier, fallback) = self.pricing.disk_multiplier(input.region)?;
                let redundancy_factor = match input.redundancy {
                    Redundancy::Zrs => self.pricing.disk_zrs_multiplier,
                    _ => 1.0,
                };
                let storage_cost = tier.unit_price * multiplier * redundancy_factor;
                CostQuote {
                    monthly_cost: storage_cost,
                    storage_cost,
                    transaction_cost: 0.0,
                    pricing_region: self.region_label(input.region, fallback),
                    fallback_region: fallback,
                }
            }
            PriceUnit::PerGb => {
                let (rates, fallback) = self.pricing.object_rates(input.region, &tier.id)?;
                let per_gb = rates.per_gb.get(&input.redundancy).ok_or_else(|| {
                    AdvisorError::MissingPricing(format!(
                        "{} rate for tier '{}'",
                        input.redundancy, tier.id
                    ))
                })?;
                let storage_cost = input.size_gb.max(0.0) * per_gb;
                let transaction_cost =
                    input.transactions as f64 / TRANSACTION_BATCH * rates.per_10k_transactions;
                CostQuote {
                    monthly_cost: storage_cost + transaction_cost,
                    storage_cost,
                    transaction_cost,
                    pricing_region: self.region_label(input.region, fallback),
                    fallback_region: fallback,
                }
            }
        };

        if quote.fallback_region {
            debug!(
                region = %input.region,
                pricing_region = %quote.pricing_region,
                tier = %tier.id,
                "No prices for region, using default pricing region"
            );
        }

        Ok(quote)
    }

    fn region_label(&self, requested: &str, fallback: bool) -> String {
        if fallback {
            normalize_region(&self.pricing.default_region)
        } else {
            normalize_region(requested)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_parts() -> (TierCatalog, PricingTables) {
        (TierCatalog::builtin(), PricingTables::builtin())
    }

    fn disk_input<'a>(tier_id: &'a str, region: &'a str) -> CostInput<'a> {
        CostInput {
            tier_id,
            size_gb: 0.0,
            transactions: 0,
            region,
            redundancy: Redundancy::Lrs,
        }
    }

    #[test]
    fn test_disk_cost_is_flat_per_tier() {
        let (catalog, pricing) = model_parts();
        let model = CostModel::from_parts(&catalog, &pricing);

        let quote = model.cost_of(disk_input("P20", "eastus")).unwrap();
        assert_eq!(quote.monthly_cost, 73.60);
        assert!(!quote.fallback_region);
        assert_eq!(quote.pricing_region, "eastus");
    }

    #[test]
    fn test_disk_cost_scales_by_region_and_zrs() {
        let (catalog, pricing) = model_parts();
        let model = CostModel::from_parts(&catalog, &pricing);

        let eu = model.cost_of(disk_input("S10", "West Europe")).unwrap();
        assert!((eu.monthly_cost - 5.89 * 1.08).abs() < 1e-9);

        let zrs = model
            .cost_of(CostInput {
                redundancy: Redundancy::Zrs,
                ..disk_input("S10", "eastus")
            })
            .unwrap();
        assert!((zrs.monthly_cost - 5.89 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_region_flags_fallback() {
        let (catalog, pricing) = model_parts();
        let model = CostModel::from_parts(&catalog, &pricing);

        let exact = model.cost_of(disk_input("P10", "eastus")).unwrap();
        let fallback = model.cost_of(disk_input("P10", "antarcticanorth")).unwrap();

        assert_eq!(exact.monthly_cost, fallback.monthly_cost);
        assert!(fallback.fallback_region);
        assert_eq!(fallback.pricing_region, "eastus");
        assert_ne!(exact, fallback);
    }

    #[test]
    fn test_object_cost_includes_transactions() {
        let (catalog, pricing) = model_parts();
        let model = CostModel::from_parts(&catalog, &pricing);

        let quote = model
            .cost_of(CostInput {
                tier_id: "Hot",
                size_gb: 1000.0,
                transactions: 1_000_000,
                region: "eastus",
                redundancy: Redundancy::Grs,
            })
            .unwrap();

        assert!((quote.storage_cost - 36.0).abs() < 1e-9);
        assert!((quote.transaction_cost - 0.44).abs() < 1e-9);
        assert!((quote.monthly_cost - 36.44).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_redundancy_is_missing_pricing() {
        let (catalog, pricing) = model_parts();
        let model = CostModel::from_parts(&catalog, &pricing);

        let result = model.cost_of(CostInput {
            tier_id: "Archive",
            size_gb: 10.0,
            transactions: 0,
            region: "eastus",
            redundancy: Redundancy::Zrs,
        });
        assert!(matches!(result, Err(AdvisorError::MissingPricing(_))));
    }

    #[test]
    fn test_unknown_tier_is_an_error() {
        let (catalog, pricing) = model_parts();
        let model = CostModel::from_parts(&catalog, &pricing);
        assert!(matches!(
            model.cost_of(disk_input("Z1", "eastus")),
            Err(AdvisorError::UnknownTier(_))
        ));
    }
}
