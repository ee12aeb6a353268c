//! Local analysis of an inventory snapshot

use advisor_lib::providers::InventoryProvider;
use advisor_lib::{AnalysisWindow, Analyzer, EngineConfig, EngineContext, RegionSelection};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::commands::costs::print_cost_summary;
use crate::commands::recommendations::print_recommendations;
use crate::output::{color_outcome, print_json, OutputFormat};

/// Overrides applied on top of the default engine thresholds
#[derive(Debug, Default)]
pub struct AnalyzeOptions {
    pub threshold: Option<f64>,
    pub window_days: Option<u32>,
    pub region: Option<String>,
    /// End of the analysis window; now when unset
    pub as_of: Option<DateTime<Utc>>,
}

impl AnalyzeOptions {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(threshold) = self.threshold {
            config.utilization_threshold_percent = threshold;
        }
        if let Some(days) = self.window_days {
            config.window_days = days;
        }
        if let Some(region) = &self.region {
            config.target_region = RegionSelection::from(region.clone());
        }
        config
    }
}

/// Run the engine against an inventory file without a service
pub async fn analyze(inventory: &Path, options: AnalyzeOptions, format: OutputFormat) -> Result<()> {
    let context = Arc::new(
        EngineContext::with_config(options.engine_config()).context("Invalid analysis options")?,
    );
    let provider = Arc::new(InventoryProvider::load(inventory).await?);
    debug!(
        inventory = %inventory.display(),
        resources = provider.resource_count(),
        "Loaded inventory"
    );

    let window = AnalysisWindow::ending_at(
        options.as_of.unwrap_or_else(Utc::now),
        context.config.window_days,
    );
    let analyzer = Analyzer::builder()
        .context(context)
        .directory(provider.clone())
        .metrics_provider(provider.clone())
        .billing(provider)
        .instance("sadv")
        .build()?;

    let report = analyzer.run_window(window).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("Outcome: {}", color_outcome(report.outcome));
            println!();
            let recommendations: Vec<_> = report.recommendations().cloned().collect();
            print_recommendations(&recommendations);
            println!();
            print_cost_summary(&report.summary, &report.scope_warnings);
            if report.skipped_resources > 0 {
                println!("{} resources skipped after evaluation errors", report.skipped_resources);
            }
        }
    }

    Ok(())
}
