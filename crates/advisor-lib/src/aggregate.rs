//! Savings aggregation
//!
//! Totals are accumulated in integer cents so the result does not depend on
//! the order assessments arrive in. A resource's current cost is counted once
//! however many recommendations it has, and its combined savings are capped at
//! that cost.

use crate::models::{to_cents, ActionKind, ResourceAssessment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cost totals for one group of resources or recommendations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTotals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub resources: usize,
    pub recommendations: usize,
    pub current_monthly_cost: f64,
    pub projected_monthly_cost: f64,
    pub monthly_savings: f64,
    pub savings_pct: f64,
}

/// Run-wide rollup of all assessments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub resources_analyzed: usize,
    pub measured_resources: usize,
    pub estimated_resources: usize,
    pub recommendations: usize,
    pub actionable_recommendations: usize,
    pub current_monthly_cost: f64,
    pub projected_monthly_cost: f64,
    pub monthly_savings: f64,
    pub savings_pct: f64,
    /// Keyed by account id
    pub by_account: BTreeMap<String, GroupTotals>,
    pub by_kind: BTreeMap<ActionKind, GroupTotals>,
}

#[derive(Default)]
struct Cents {
    name: Option<String>,
    resources: usize,
    recommendations: usize,
    current: i64,
    savings: i64,
}

impl Cents {
    fn totals(&self) -> GroupTotals {
        GroupTotals {
            name: self.name.clone(),
            resources: self.resources,
            recommendations: self.recommendations,
            current_monthly_cost: from_cents(self.current),
            projected_monthly_cost: from_cents(self.current - self.savings),
            monthly_savings: from_cents(self.savings),
            savings_pct: savings_pct(self.savings, self.current),
        }
    }
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Savings as a percentage of current cost, two decimals; zero when nothing is spent
pub fn savings_pct(savings_cents: i64, current_cents: i64) -> f64 {
    if current_cents <= 0 {
        return 0.0;
    }
    (savings_cents as f64 / current_cents as f64 * 10_000.0).round() / 100.0
}

/// Roll assessments up into totals by account and by recommendation kind
pub fn summarize(assessments: &[ResourceAssessment]) -> Summary {
    let mut total = Cents::default();
    let mut by_account: BTreeMap<String, Cents> = BTreeMap::new();
    let mut by_kind: BTreeMap<ActionKind, Cents> = BTreeMap::new();
    let mut measured = 0;
    let mut actionable = 0;

    for assessment in assessments {
        let Some(first) = assessment.recommendations.first() else {
            continue;
        };

        if assessment.usage.is_measured() {
            measured += 1;
        }

        let current = to_cents(first.current_monthly_cost);
        let claimed: i64 = assessment
            .recommendations
            .iter()
            .filter(|r| r.kind.is_actionable())
            .map(|r| to_cents(r.monthly_savings))
            .sum();
        let savings = claimed.min(current).max(0);

        for rec in &assessment.recommendations {
            if rec.kind.is_actionable() {
                actionable += 1;
            }
            let kind = by_kind.entry(rec.kind).or_default();
            kind.resources += 1;
            kind.recommendations += 1;
            kind.current += to_cents(rec.current_monthly_cost);
            kind.savings += to_cents(rec.monthly_savings);
        }

        let account = by_account.entry(first.account_id.clone()).or_default();
        if account.name.is_none() && !first.account_name.is_empty() {
            account.name = Some(first.account_name.clone());
        }
        for group in [account, &mut total] {
            group.resources += 1;
            group.recommendations += assessment.recommendations.len();
            group.current += current;
            group.savings += savings;
        }
    }

    let totals = total.totals();
    Summary {
        resources_analyzed: total.resources,
        measured_resources: measured,
        estimated_resources: total.resources - measured,
        recommendations: total.recommendations,
        actionable_recommendations: actionable,
        current_monthly_cost: totals.current_monthly_cost,
        projected_monthly_cost: totals.projected_monthly_cost,
        monthly_savings: totals.monthly_savings,
        savings_pct: totals.savings_pct,
        by_account: by_account.into_iter().map(|(k, v)| (k, v.totals())).collect(),
        by_kind: by_kind.into_iter().map(|(k, v)| (k, v.totals())).collect(),
    }
}
