//! Output formatting utilities

use advisor_lib::{ActionKind, RunOutcome};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format an optional utilization percentage
pub fn format_pct(pct: Option<f64>) -> String {
    pct.map(|p| format!("{:.1}%", p))
        .unwrap_or_else(|| "-".to_string())
}

/// Color a recommendation kind by how much action it asks for
pub fn color_kind(kind: ActionKind) -> String {
    let label = kind.as_str();
    match kind {
        ActionKind::DecommissionCandidate => label.red().bold().to_string(),
        ActionKind::Retain | ActionKind::RetainNoSuitableTier => label.dimmed().to_string(),
        ActionKind::TagCompliance | ActionKind::SecurityPosture => label.yellow().to_string(),
        _ => label.green().to_string(),
    }
}

pub fn color_outcome(outcome: RunOutcome) -> String {
    let label = outcome.as_str();
    match outcome {
        RunOutcome::Opportunities => label.green().to_string(),
        RunOutcome::NothingToRecommend => label.blue().to_string(),
        RunOutcome::NoUsableData => label.red().to_string(),
    }
}
