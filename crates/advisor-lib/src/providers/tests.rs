//! Tests for the inventory provider and the retry wrapper

#[cfg(test)]
mod inventory_tests {
    use crate::models::{AnalysisWindow, MetricName};
    use crate::providers::{BillingProvider, InventoryProvider, MetricsProvider, ResourceDirectory};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use tokio::fs;

    const SNAPSHOT: &str = r#"{
        "scopes": [
            {
                "id": "sub-prod",
                "name": "Production",
                "resources": [
                    {
                        "resource_group": "rg-data",
                        "resource_id": "/disks/data-01",
                        "name": "data-01",
                        "region": "eastus",
                        "class": "premium_ssd",
                        "size_gb": 512,
                        "details": {"kind": "managed_disk", "attachment": {"state": "unattached"}}
                    }
                ]
            },
            {"id": "sub-legacy", "name": "Legacy", "error": "authorization failed"}
        ],
        "metrics": {
            "/disks/data-01": {
                "read_ops": {"points": [
                    {"timestamp": "2024-01-10T00:00:00Z", "average": 12.0},
                    {"timestamp": "2023-11-01T00:00:00Z", "average": 900.0}
                ]}
            }
        },
        "billing": {"/disks/data-01": 80.25}
    }"#;

    fn january() -> AnalysisWindow {
        AnalysisWindow::ending_at(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(), 30)
    }

    async fn write_snapshot(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("inventory.json");
        fs::write(&path, SNAPSHOT).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_fills_account_identity_from_scope() {
        let dir = TempDir::new().unwrap();
        let provider = InventoryProvider::load(write_snapshot(&dir).await).await.unwrap();

        let scopes = provider.list_scopes().await.unwrap();
        assert_eq!(scopes.len(), 2);

        let resources = provider.list_resources(&scopes[0]).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].account_id, "sub-prod");
        assert_eq!(resources[0].account_name, "Production");
        assert_eq!(provider.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_scope_returns_error() {
        let provider = InventoryProvider::from_json(SNAPSHOT).unwrap();
        let scopes = provider.list_scopes().await.unwrap();

        let err = provider.list_resources(&scopes[1]).await.unwrap_err();
        assert!(err.to_string().contains("authorization failed"));
    }

    #[tokio::test]
    async fn test_metrics_are_clipped_to_window() {
        let provider = InventoryProvider::from_json(SNAPSHOT).unwrap();

        let series = provider
            .fetch_metric("/disks/data-01", MetricName::ReadOps, &january())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.data_points(), 1);
        assert_eq!(series.mean_average(), Some(12.0));

        let missing = provider
            .fetch_metric("/disks/data-01", MetricName::WriteOps, &january())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_billing_lookup() {
        let provider = InventoryProvider::from_json(SNAPSHOT).unwrap();

        assert_eq!(
            provider.actual_cost("/disks/data-01", &january()).await.unwrap(),
            Some(80.25)
        );
        assert_eq!(provider.actual_cost("/disks/other", &january()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let err = InventoryProvider::load(dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}

#[cfg(test)]
mod retry_tests {
    use crate::models::{AnalysisWindow, MetricName, TimeSeries};
    use crate::providers::{async_trait, MetricsProvider, RetryPolicy, RetryingMetricsProvider};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Fails a fixed number of times before succeeding
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
        series: Option<TimeSeries>,
    }

    impl FlakyProvider {
        fn new(failures: u32, series: Option<TimeSeries>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                series,
            }
        }
    }

    #[async_trait]
    impl MetricsProvider for FlakyProvider {
        async fn fetch_metric(
            &self,
            _resource_id: &str,
            _metric: MetricName,
            _window: &AnalysisWindow,
        ) -> anyhow::Result<Option<TimeSeries>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                anyhow::bail!("throttled (call {})", call);
            }
            Ok(self.series.clone())
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .max_attempts(attempts)
            .initial_backoff(Duration::from_millis(1))
            .max_backoff(Duration::from_millis(2))
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy::default()
            .initial_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(350));

        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let inner = Arc::new(FlakyProvider::new(2, Some(TimeSeries::default())));
        let provider = RetryingMetricsProvider::new(inner.clone(), fast_policy(3));

        let result = provider
            .fetch_metric("/disks/a", MetricName::ReadOps, &AnalysisWindow::last_days(30))
            .await
            .unwrap();
        assert!(result.is_some());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = Arc::new(FlakyProvider::new(5, None));
        let provider = RetryingMetricsProvider::new(inner.clone(), fast_policy(2));

        let err = provider
            .fetch_metric("/disks/a", MetricName::ReadOps, &AnalysisWindow::last_days(30))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("call 2"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_absent_metric_is_not_retried() {
        let inner = Arc::new(FlakyProvider::new(0, None));
        let provider = RetryingMetricsProvider::new(inner.clone(), fast_policy(4));

        let result = provider
            .fetch_metric("/disks/a", MetricName::WriteOps, &AnalysisWindow::last_days(30))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
