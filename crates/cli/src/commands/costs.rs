//! Cost-related CLI commands

use advisor_lib::{GroupTotals, ScopeWarning, Summary};
use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_outcome, format_currency, print_json, print_warning, OutputFormat};

/// Row for a savings breakdown table
#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Resources")]
    resources: usize,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Projected")]
    projected: String,
    #[tabled(rename = "Savings")]
    savings: String,
    #[tabled(rename = "%")]
    pct: String,
}

impl BreakdownRow {
    fn new(group: String, totals: &GroupTotals) -> Self {
        Self {
            group,
            resources: totals.resources,
            current: format_currency(totals.current_monthly_cost, "USD"),
            projected: format_currency(totals.projected_monthly_cost, "USD"),
            savings: format_currency(totals.monthly_savings, "USD"),
            pct: format!("{:.1}", totals.savings_pct),
        }
    }
}

/// Show cost analysis from the service, cluster-wide or for one account
pub async fn show_costs(client: &ApiClient, account: Option<String>, format: OutputFormat) -> Result<()> {
    let report = client.get_summary().await?;

    if let Some(account) = account {
        let (id, totals) = find_account(&report.summary, &account)
            .ok_or_else(|| anyhow::anyhow!("No account matching '{}' in the latest report", account))?;

        return match format {
            OutputFormat::Json => print_json(totals),
            OutputFormat::Table => {
                println!("{}", "Cost Analysis".bold());
                println!("{}", "=".repeat(50));
                println!(
                    "Account:                {}",
                    totals.name.as_deref().unwrap_or(id).cyan()
                );
                print_totals(
                    totals.resources,
                    totals.current_monthly_cost,
                    totals.projected_monthly_cost,
                    totals.monthly_savings,
                    totals.savings_pct,
                );
                Ok(())
            }
        };
    }

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "Outcome: {}    Generated: {}",
                color_outcome(report.outcome),
                report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
            );
            print_cost_summary(&report.summary, &report.scope_warnings);
        }
    }

    Ok(())
}

/// Match an account by id or display name, case-insensitive
fn find_account<'a>(summary: &'a Summary, account: &str) -> Option<(&'a str, &'a GroupTotals)> {
    summary
        .by_account
        .iter()
        .find(|(id, totals)| {
            id.eq_ignore_ascii_case(account)
                || totals
                    .name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(account))
        })
        .map(|(id, totals)| (id.as_str(), totals))
}

fn print_totals(resources: usize, current: f64, projected: f64, savings: f64, pct: f64) {
    println!("Resources:              {}", resources);
    println!();

    println!("{}", "Monthly Costs".bold());
    println!("{}", "-".repeat(50));
    println!("Current:                {}", format_currency(current, "USD"));
    println!(
        "Projected:              {}",
        format_currency(projected, "USD").green()
    );
    println!();
    println!(
        "{} {} ({:.1}%)",
        "Potential Savings:".bold(),
        format_currency(savings, "USD").green().bold(),
        pct
    );
}

/// Totals plus per-account and per-action breakdowns
pub fn print_cost_summary(summary: &Summary, scope_warnings: &[ScopeWarning]) {
    println!("{}", "Cost Analysis".bold());
    println!("{}", "=".repeat(50));
    println!(
        "Measured / estimated:   {} / {}",
        summary.measured_resources, summary.estimated_resources
    );
    print_totals(
        summary.resources_analyzed,
        summary.current_monthly_cost,
        summary.projected_monthly_cost,
        summary.monthly_savings,
        summary.savings_pct,
    );

    if !summary.by_account.is_empty() {
        println!();
        println!("{}", "Savings by Account".bold());
        let rows: Vec<BreakdownRow> = summary
            .by_account
            .iter()
            .map(|(id, totals)| BreakdownRow::new(totals.name.clone().unwrap_or_else(|| id.clone()), totals))
            .collect();
        println!(
            "{}",
            tabled::Table::new(rows).with(tabled::settings::Style::rounded())
        );
    }

    let actionable: Vec<BreakdownRow> = summary
        .by_kind
        .iter()
        .filter(|(kind, _)| kind.is_actionable())
        .map(|(kind, totals)| BreakdownRow::new(kind.to_string(), totals))
        .collect();
    if !actionable.is_empty() {
        println!();
        println!("{}", "Savings by Action".bold());
        println!(
            "{}",
            tabled::Table::new(actionable).with(tabled::settings::Style::rounded())
        );
    }

    for warning in scope_warnings {
        print_warning(&format!(
            "Scope {} skipped: {}",
            warning.scope_id, warning.error
        ));
    }
}
