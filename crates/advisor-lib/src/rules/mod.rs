//! Decision rules
//!
//! Turns a resource, its usage sample and its cost into recommendations.
//! Managed disks get exactly one recommendation from an ordered rule chain;
//! storage accounts are checked along several independent axes.
//!
//! Money is rounded to cents when a recommendation is built, and savings are
//! never negative: a candidate that would cost more is not offered.

mod account;
mod disk;


use crate::config::EngineContext;
use crate::error::Result;
use crate::models::{
    round_cents, ActionKind, AnalysisWindow, CostBasis, Recommendation, Redundancy,
    ResourceAssessment, ResourceDescriptor, ResourceDetails, UsageSample,
};

/// Evaluate one resource
///
/// `billed_cost` is the actual billed amount over `window`, if known; it is
/// normalised to a month and supersedes the cost model's estimate of the
/// current cost.
pub fn assess(
    resource: &ResourceDescriptor,
    usage: UsageSample,
    billed_cost: Option<f64>,
    window: &AnalysisWindow,
    context: &EngineContext,
) -> Result<ResourceAssessment> {
    let billed_monthly = billed_cost.map(|cost| monthly_from_window(cost, window));

    let recommendations = match &resource.details {
        ResourceDetails::ManagedDisk(details) => {
            vec![disk::evaluate(resource, &details.attachment, &usage, billed_monthly, context)?]
        }
        ResourceDetails::StorageAccount(details) => {
            account::evaluate(resource, details, &usage, billed_monthly, window, context)?
        }
    };

    Ok(ResourceAssessment {
        resource_id: resource.resource_id.clone(),
        usage,
        recommendations,
    })
}

/// Days in a billing month
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Scale an amount accrued over `window` to one month
pub fn monthly_from_window(amount: f64, window: &AnalysisWindow) -> f64 {
    let days = window.days();
    if days <= 0.0 {
        return amount.max(0.0);
    }
    amount.max(0.0) * DAYS_PER_MONTH / days
}

/// `value` as a percentage of `capacity`; zero capacity yields zero
pub(crate) fn utilization_pct(value: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    (value / capacity * 100.0 * 100.0).round() / 100.0
}

/// Fields shared by every recommendation for one resource
pub(crate) struct Draft<'a> {
    pub resource: &'a ResourceDescriptor,
    pub usage: &'a UsageSample,
    pub current_tier: &'a str,
    pub current_cost: f64,
    pub cost_basis: CostBasis,
    pub pricing_fallback: bool,
    pub baseline_utilization_pct: Option<f64>,
    pub burst_utilization_pct: Option<f64>,
}

/// Proposed change carried by one recommendation
#[derive(Debug, Default)]
pub(crate) struct Target<'a> {
    pub tier: Option<&'a str>,
    pub redundancy: Option<Redundancy>,
    pub projected_cost: Option<f64>,
    pub pricing_fallback: bool,
}

impl<'a> Draft<'a> {
    /// Build a recommendation; an absent projected cost means no change
    pub fn finish(&self, kind: ActionKind, target: Target<'_>, reason: String) -> Recommendation {
        let current = round_cents(self.current_cost.max(0.0));
        let projected = round_cents(target.projected_cost.unwrap_or(current).max(0.0));
        let monthly_savings = round_cents((current - projected).max(0.0));

        Recommendation {
            account_id: self.resource.account_id.clone(),
            account_name: self.resource.account_name.clone(),
            resource_id: self.resource.resource_id.clone(),
            resource_name: self.resource.name.clone(),
            region: self.resource.region.clone(),
            kind,
            current_tier: self.current_tier.to_string(),
            target_tier: target.tier.map(str::to_string),
            target_redundancy: target.redundancy,
            current_monthly_cost: current,
            projected_monthly_cost: projected,
            monthly_savings,
            baseline_utilization_pct: self.baseline_utilization_pct,
            burst_utilization_pct: self.burst_utilization_pct,
            usage_source: self.usage.source,
            cost_basis: self.cost_basis,
            pricing_fallback: self.pricing_fallback || target.pricing_fallback,
            reason,
        }
    }

    /// Whether a candidate cost is a strict saving after rounding
    pub fn is_cheaper(&self, candidate_cost: f64) -> bool {
        round_cents(candidate_cost) < round_cents(self.current_cost)
    }
}
