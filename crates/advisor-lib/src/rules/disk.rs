//! Managed disk rule chain
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. unattached disk: decommission candidate, saving the full current cost
//! 2. attached to a powered-off host: move to the capacity tier for its size
//! 3. baseline utilization under the threshold: cheapest capacity tier that
//!    still covers size, peak IOPS and peak throughput
//! 4. otherwise retain

use super::{utilization_pct, Draft, Target};
use crate::catalog::TierSpec;
use crate::config::EngineContext;
use crate::cost::{CostInput, CostModel, CostQuote};
use crate::error::Result;
use crate::models::{
    ActionKind, Attachment, CostBasis, Recommendation, ResourceDescriptor, UsageSample,
};

pub(super) fn evaluate(
    resource: &ResourceDescriptor,
    attachment: &Attachment,
    usage: &UsageSample,
    billed_monthly: Option<f64>,
    context: &EngineContext,
) -> Result<Recommendation> {
    let config = &context.config;
    let model = CostModel::new(context);
    let region = config.target_region.region_for(resource);

    let current_tier = context.catalog.current_tier(resource)?;
    let quote = |tier: &TierSpec| -> Result<CostQuote> {
        model.cost_of_spec(
            tier,
            CostInput {
                tier_id: &tier.id,
                size_gb: resource.size_gb as f64,
                transactions: 0,
                region,
                redundancy: resource.redundancy,
            },
        )
    };

    let current_quote = quote(current_tier)?;
    let (current_cost, cost_basis) = match billed_monthly {
        Some(billed) => (billed, CostBasis::Billed),
        None => (current_quote.monthly_cost, CostBasis::Estimated),
    };

    let baseline_pct = utilization_pct(usage.avg_iops(), current_tier.baseline_iops as f64);
    let burst_pct = utilization_pct(usage.peak_iops, current_tier.burst_iops as f64);

    let draft = Draft {
        resource,
        usage,
        current_tier: &current_tier.id,
        current_cost,
        cost_basis,
        pricing_fallback: current_quote.fallback_region,
        baseline_utilization_pct: Some(baseline_pct),
        burst_utilization_pct: Some(burst_pct),
    };

    let (vm_id, power_state) = match attachment {
        Attachment::Unattached => {
            return Ok(draft.finish(
                ActionKind::DecommissionCandidate,
                Target {
                    projected_cost: Some(0.0),
                    ..Default::default()
                },
                format!(
                    "Disk is not attached to any VM; snapshot and delete it to save ${:.2}/month",
                    current_cost
                ),
            ));
        }
        Attachment::Attached { vm_id, power_state } => (vm_id, power_state),
    };

    if power_state.is_powered_off() {
        let target = context.catalog.tier_for(resource.size_gb, config.capacity_class)?;
        let target_quote = quote(target)?;

        if !target.id.eq_ignore_ascii_case(&current_tier.id) && draft.is_cheaper(target_quote.monthly_cost) {
            return Ok(draft.finish(
                ActionKind::DowngradeToCapacityTier,
                Target {
                    tier: Some(&target.id),
                    projected_cost: Some(target_quote.monthly_cost),
                    pricing_fallback: target_quote.fallback_region,
                    ..Default::default()
                },
                format!(
                    "Host {} is {:?}; {} GB fits capacity tier {} at ${:.2}/month",
                    vm_id, power_state, resource.size_gb, target.id, target_quote.monthly_cost
                ),
            ));
        }

        return Ok(draft.finish(
            ActionKind::Retain,
            Target::default(),
            format!(
                "Host {} is {:?} but capacity tier {} is not cheaper than {}",
                vm_id, power_state, target.id, current_tier.id
            ),
        ));
    }

    let threshold = config.utilization_threshold_percent;
    if baseline_pct < threshold {
        let candidate = context
            .catalog
            .tiers(config.capacity_class)?
            .iter()
            .find(|t| t.accommodates(resource.size_gb, usage.peak_iops, usage.peak_throughput_mbps));

        let Some(candidate) = candidate else {
            return Ok(draft.finish(
                ActionKind::RetainNoSuitableTier,
                Target::default(),
                format!(
                    "Baseline utilization {:.1}% is below {:.0}% but no {} tier covers {} GB at {:.0} IOPS / {:.1} MB/s peak",
                    baseline_pct,
                    threshold,
                    config.capacity_class,
                    resource.size_gb,
                    usage.peak_iops,
                    usage.peak_throughput_mbps
                ),
            ));
        };

        let candidate_quote = quote(candidate)?;
        if candidate.id.eq_ignore_ascii_case(&current_tier.id) || !draft.is_cheaper(candidate_quote.monthly_cost) {
            return Ok(draft.finish(
                ActionKind::RetainNoSuitableTier,
                Target::default(),
                format!(
                    "Baseline utilization {:.1}% is below {:.0}% but the smallest fitting tier {} is not cheaper",
                    baseline_pct, threshold, candidate.id
                ),
            ));
        }

        return Ok(draft.finish(
            ActionKind::Downgrade,
            Target {
                tier: Some(&candidate.id),
                projected_cost: Some(candidate_quote.monthly_cost),
                pricing_fallback: candidate_quote.fallback_region,
                ..Default::default()
            },
            format!(
                "Baseline utilization {:.1}% (burst {:.1}%) is below {:.0}%; {} covers peak demand",
                baseline_pct, burst_pct, threshold, candidate.id
            ),
        ));
    }

    Ok(draft.finish(
        ActionKind::Retain,
        Target::default(),
        format!(
            "Baseline utilization {:.1}% (burst {:.1}%) meets the {:.0}% threshold",
            baseline_pct, burst_pct, threshold
        ),
    ))
}
