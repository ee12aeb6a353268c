//! Storage account axes
//!
//! Cost axes: decommission, access tier, redundancy, lifecycle policy and
//! reserved capacity. A decommission candidate suppresses the other cost axes.
//! Tag compliance and security posture are always checked. An account that
//! triggers nothing gets a single retain.

use super::{monthly_from_window, utilization_pct, Draft, Target};
use crate::catalog::TierSpec;
use crate::config::EngineContext;
use crate::cost::{CostInput, CostModel, CostQuote};
use crate::error::Result;
use crate::models::{
    AccountDetails, ActionKind, AnalysisWindow, CostBasis, MetricName, Recommendation, Redundancy,
    ResourceDescriptor, UsageSample,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

pub(super) fn evaluate(
    resource: &ResourceDescriptor,
    details: &AccountDetails,
    usage: &UsageSample,
    billed_monthly: Option<f64>,
    window: &AnalysisWindow,
    context: &EngineContext,
) -> Result<Vec<Recommendation>> {
    let config = &context.config;
    let model = CostModel::new(context);
    let region = config.target_region.region_for(resource);

    let current_tier = context.catalog.current_tier(resource)?;
    let used_gb = usage.used_capacity_gb.max(0.0);
    let tx_measured = usage.has_metric(MetricName::Transactions);
    // Estimated traffic is never priced
    let monthly_tx = if tx_measured {
        monthly_from_window(usage.transactions as f64, window).round() as u64
    } else {
        0
    };

    let quote = |tier: &TierSpec, size_gb: f64, transactions: u64, redundancy: Redundancy| -> Result<CostQuote> {
        model.cost_of_spec(
            tier,
            CostInput {
                tier_id: &tier.id,
                size_gb,
                transactions,
                region,
                redundancy,
            },
        )
    };

    let current_quote = quote(current_tier, used_gb, monthly_tx, resource.redundancy)?;
    let (current_cost, cost_basis) = match billed_monthly {
        Some(billed) => (billed, CostBasis::Billed),
        None => (current_quote.monthly_cost, CostBasis::Estimated),
    };

    let baseline_pct = tx_measured.then(|| {
        let seconds = window.days() * SECONDS_PER_DAY;
        let rate = if seconds > 0.0 { usage.transactions as f64 / seconds } else { 0.0 };
        utilization_pct(rate, current_tier.baseline_iops as f64)
    });

    let draft = Draft {
        resource,
        usage,
        current_tier: &current_tier.id,
        current_cost,
        cost_basis,
        pricing_fallback: current_quote.fallback_region,
        baseline_utilization_pct: baseline_pct,
        burst_utilization_pct: None,
    };

    let mut recommendations = Vec::new();

    let inactive = tx_measured && usage.transactions == 0 && used_gb < config.low_usage_capacity_gb;
    if inactive {
        recommendations.push(draft.finish(
            ActionKind::DecommissionCandidate,
            Target {
                projected_cost: Some(0.0),
                ..Default::default()
            },
            format!(
                "No transactions in {:.0} days and only {:.2} GB stored; delete the account",
                window.days(),
                used_gb
            ),
        ));
    } else {
        // Access tier
        if tx_measured {
            let tx_per_gb = monthly_tx as f64 / used_gb.max(1.0);
            let next = match current_tier.id.to_ascii_lowercase().as_str() {
                "hot" if tx_per_gb < config.hot_to_cool_max_tx_per_gb => Some("Cool"),
                "cool" if tx_per_gb < config.cool_to_cold_max_tx_per_gb => Some("Cold"),
                _ => None,
            };
            if let Some(next) = next {
                let target = context.catalog.spec_of(next)?;
                let target_quote = quote(target, used_gb, monthly_tx, resource.redundancy)?;
                if draft.is_cheaper(target_quote.monthly_cost) {
                    recommendations.push(draft.finish(
                        ActionKind::AccessTierChange,
                        Target {
                            tier: Some(&target.id),
                            projected_cost: Some(target_quote.monthly_cost),
                            pricing_fallback: target_quote.fallback_region,
                            ..Default::default()
                        },
                        format!(
                            "{:.2} transactions/GB per month on {} data; {} is cheaper at this access rate",
                            tx_per_gb, current_tier.id, target.id
                        ),
                    ));
                }
            }
        }

        // Redundancy
        if resource.redundancy.is_geo() && !config.is_critical(resource) {
            let regional = resource.redundancy.regional_equivalent();
            let target_quote = quote(current_tier, used_gb, monthly_tx, regional)?;
            if draft.is_cheaper(target_quote.monthly_cost) {
                recommendations.push(draft.finish(
                    ActionKind::RedundancyDowngrade,
                    Target {
                        redundancy: Some(regional),
                        projected_cost: Some(target_quote.monthly_cost),
                        pricing_fallback: target_quote.fallback_region,
                        ..Default::default()
                    },
                    format!(
                        "{} geo-replication on a resource not tagged critical; {} keeps in-region durability",
                        resource.redundancy, regional
                    ),
                ));
            }
        }

        // Lifecycle policy
        if !details.lifecycle_policy && used_gb >= config.lifecycle_min_gb {
            let movable_gb = used_gb * config.lifecycle_cool_fraction;
            let saving = if current_tier.id.eq_ignore_ascii_case("hot") {
                let cool = context.catalog.spec_of("Cool")?;
                let hot_cost = quote(current_tier, movable_gb, 0, resource.redundancy)?;
                let cool_cost = quote(cool, movable_gb, 0, resource.redundancy)?;
                (hot_cost.monthly_cost - cool_cost.monthly_cost).max(0.0)
            } else {
                0.0
            };
            recommendations.push(draft.finish(
                ActionKind::LifecyclePolicy,
                Target {
                    projected_cost: Some(current_cost - saving),
                    ..Default::default()
                },
                format!(
                    "No lifecycle management policy on {:.0} GB; tiering {:.0}% of data by age",
                    used_gb,
                    config.lifecycle_cool_fraction * 100.0
                ),
            ));
        }

        // Reserved capacity
        if used_gb >= config.reserved_min_gb && current_quote.storage_cost >= config.reserved_min_monthly_cost {
            let saving = current_quote.storage_cost * config.reserved_discount;
            recommendations.push(draft.finish(
                ActionKind::ReservedCapacity,
                Target {
                    projected_cost: Some(current_cost - saving),
                    ..Default::default()
                },
                format!(
                    "{:.0} GB steady capacity qualifies for reserved pricing at {:.0}% off storage",
                    used_gb,
                    config.reserved_discount * 100.0
                ),
            ));
        }
    }

    let missing_tags = config.missing_tags(resource);
    if !missing_tags.is_empty() {
        recommendations.push(draft.finish(
            ActionKind::TagCompliance,
            Target::default(),
            format!("Missing required tags: {}", missing_tags.join(", ")),
        ));
    }

    let findings = security_findings(details);
    if !findings.is_empty() {
        recommendations.push(draft.finish(
            ActionKind::SecurityPosture,
            Target::default(),
            findings.join("; "),
        ));
    }

    if recommendations.is_empty() {
        recommendations.push(draft.finish(
            ActionKind::Retain,
            Target::default(),
            "No cost, compliance or security change needed".to_string(),
        ));
    }

    Ok(recommendations)
}

fn security_findings(details: &AccountDetails) -> Vec<String> {
    let mut findings = Vec::new();
    if !details.https_only {
        findings.push("HTTPS-only transfer is disabled".to_string());
    }
    if details.allow_public_access {
        findings.push("Anonymous public blob access is allowed".to_string());
    }
    if tls_below_1_2(&details.min_tls_version) {
        findings.push(format!(
            "Minimum TLS version {} is below TLS 1.2",
            details.min_tls_version
        ));
    }
    findings
}

/// Accepts "TLS1_2", "TLS 1.2", "1.2" and similar spellings
fn tls_below_1_2(version: &str) -> bool {
    let digits: String = version.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u32>() {
        Ok(v) => v < 12,
        Err(_) => true,
    }
}
