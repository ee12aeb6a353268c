//! Periodic analysis runs

use crate::config::AdvisorConfig;
use crate::state::ReportStore;
use advisor_lib::providers::{InventoryProvider, RetryingMetricsProvider};
use advisor_lib::{AnalysisReport, Analyzer, EngineContext};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Runs the analysis on a fixed interval and publishes each report
pub struct AnalysisRunner {
    config: AdvisorConfig,
    context: Arc<EngineContext>,
    store: ReportStore,
}

impl AnalysisRunner {
    pub fn new(config: AdvisorConfig, context: Arc<EngineContext>, store: ReportStore) -> Self {
        Self {
            config,
            context,
            store,
        }
    }

    /// Load the inventory and analyze it once
    pub async fn run_once(&self) -> Result<AnalysisReport> {
        let inventory = Arc::new(InventoryProvider::load(&self.config.inventory_path).await?);
        let metrics = Arc::new(RetryingMetricsProvider::new(
            inventory.clone(),
            self.config.retry.clone(),
        ));

        let analyzer = Analyzer::builder()
            .context(self.context.clone())
            .directory(inventory.clone())
            .metrics_provider(metrics)
            .billing(inventory)
            .instance(self.config.instance.clone())
            .build()?;

        let report = analyzer.run().await.context("Analysis run failed")?;
        Ok(report)
    }

    /// Run once and record the result in the store
    pub async fn run_and_publish(&self) {
        match self.run_once().await {
            Ok(report) => {
                info!(
                    outcome = %report.outcome,
                    resources = report.summary.resources_analyzed,
                    monthly_savings = report.summary.monthly_savings,
                    "Published analysis report"
                );
                self.store.publish(report).await;
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!(error = %message, "Analysis run failed");
                self.store.record_failure(message).await;
            }
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval_secs,
            inventory = %self.config.inventory_path.display(),
            "Starting analysis loop"
        );

        let mut ticker = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_and_publish().await,
                _ = shutdown.recv() => {
                    info!("Shutting down analysis loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HealthStatus;
    use advisor_lib::RunOutcome;
    use tempfile::TempDir;

    const INVENTORY: &str = r#"{
        "scopes": [{
            "id": "sub-prod",
            "resources": [{
                "resource_group": "rg-app",
                "resource_id": "/disks/orphan",
                "name": "orphan",
                "region": "eastus",
                "class": "premium_ssd",
                "tier": "P10",
                "size_gb": 128,
                "details": {"kind": "managed_disk", "attachment": {"state": "unattached"}}
            }]
        }]
    }"#;

    fn runner(dir: &TempDir, store: ReportStore) -> AnalysisRunner {
        let config = AdvisorConfig {
            inventory_path: dir.path().join("inventory.json"),
            ..Default::default()
        };
        let context = Arc::new(config.engine_context().unwrap());
        AnalysisRunner::new(config, context, store)
    }

    #[tokio::test]
    async fn test_run_publishes_report() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("inventory.json"), INVENTORY).unwrap();
        let store = ReportStore::new();

        runner(&dir, store.clone()).run_and_publish().await;

        let report = store.latest().await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Opportunities);
        assert_eq!(report.summary.monthly_savings, 19.71);
        assert!(store.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_missing_inventory_records_failure() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new();

        runner(&dir, store.clone()).run_and_publish().await;

        assert!(store.latest().await.is_none());
        let health = store.health().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.last_error.unwrap().contains("inventory.json"));
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("inventory.json"), INVENTORY).unwrap();
        let store = ReportStore::new();
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(runner(&dir, store.clone()).run(rx));
        // First tick fires immediately
        for _ in 0..50 {
            if store.latest().await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(store.latest().await.is_some());
    }
}
