//! Recommendation listing

use advisor_lib::{ActionKind, Recommendation};
use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_kind, color_outcome, format_currency, format_pct, print_info, print_json, print_warning,
    OutputFormat,
};

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Action")]
    kind: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Baseline")]
    baseline: String,
    #[tabled(rename = "Burst")]
    burst: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Savings")]
    savings: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(r: &Recommendation) -> Self {
        let tier = match (&r.target_tier, r.target_redundancy) {
            (Some(target), _) if *target != r.current_tier => {
                format!("{} -> {}", r.current_tier, target)
            }
            (_, Some(redundancy)) => format!("{} ({})", r.current_tier, redundancy),
            _ => r.current_tier.clone(),
        };
        let mut savings = format_currency(r.monthly_savings, "USD");
        if r.pricing_fallback {
            savings.push('*');
        }

        Self {
            account: if r.account_name.is_empty() {
                r.account_id.clone()
            } else {
                r.account_name.clone()
            },
            resource: r.resource_name.clone(),
            kind: color_kind(r.kind),
            tier,
            baseline: format_pct(r.baseline_utilization_pct),
            burst: format_pct(r.burst_utilization_pct),
            current: format_currency(r.current_monthly_cost, "USD"),
            savings,
        }
    }
}

/// Get recommendations from the service with optional filters
pub async fn get_recommendations(
    client: &ApiClient,
    account: Option<String>,
    kind: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    // Reject typos before the round trip
    if let Some(kind) = &kind {
        kind.parse::<ActionKind>().map_err(anyhow::Error::msg)?;
    }

    let result = client
        .get_recommendations(account.as_deref(), kind.as_deref())
        .await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_info(&format!(
                "Report from {} ({})",
                result.generated_at.format("%Y-%m-%d %H:%M:%S"),
                color_outcome(result.outcome)
            ));
            print_recommendations(&result.recommendations);
        }
    }

    Ok(())
}

/// Render recommendations as a table
pub fn print_recommendations(recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        print_warning("No recommendations found");
        return;
    }

    let rows: Vec<RecommendationRow> = recommendations.iter().map(RecommendationRow::from).collect();
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    let total: f64 = recommendations.iter().map(|r| r.monthly_savings).sum();
    println!(
        "\nTotal: {} recommendations, {} per month before overlap",
        recommendations.len(),
        format_currency(total, "USD")
    );
    if recommendations.iter().any(|r| r.pricing_fallback) {
        println!("* priced with the default region");
    }
}
