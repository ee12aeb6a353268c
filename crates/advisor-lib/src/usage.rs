//! Usage estimation
//!
//! Resolves telemetry for one resource into a [`UsageSample`]. Every metric is
//! fetched independently: a failed or absent metric contributes zero and is
//! listed in `missing_metrics`. When nothing at all was collected the sample is
//! synthesized from the resource's state instead:
//!
//! | State                         | Average            | Peak               |
//! |-------------------------------|--------------------|--------------------|
//! | unattached disk               | 0                  | 0                  |
//! | attached, host powered off    | 5% of baseline     | 15% of baseline    |
//! | attached, running or unknown  | 20% of baseline    | 40% of baseline    |
//! | storage account               | 0, capacity kept   | 0                  |

use crate::catalog::TierSpec;
use crate::models::{
    AnalysisWindow, Attachment, FallbackReason, MetricName, ResourceDescriptor, TimeSeries,
    UsageSample, UsageSource,
};
use crate::providers::MetricsProvider;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const HOST_STOPPED_AVERAGE_FRACTION: f64 = 0.05;
pub const HOST_STOPPED_PEAK_FRACTION: f64 = 0.15;
pub const NO_TELEMETRY_AVERAGE_FRACTION: f64 = 0.20;
pub const NO_TELEMETRY_PEAK_FRACTION: f64 = 0.40;

/// Peak assumed relative to the average when no maxima were reported
pub const PEAK_TO_AVERAGE_RATIO: f64 = 2.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Builds usage samples from a metrics provider
#[derive(Clone)]
pub struct UsageEstimator {
    metrics: Arc<dyn MetricsProvider>,
}

impl UsageEstimator {
    pub fn new(metrics: Arc<dyn MetricsProvider>) -> Self {
        Self { metrics }
    }

    /// Usage of `resource` over `window`; `tier` is its current tier
    pub async fn estimate(
        &self,
        resource: &ResourceDescriptor,
        tier: &TierSpec,
        window: &AnalysisWindow,
    ) -> UsageSample {
        let names = if resource.is_storage_account() {
            MetricName::ACCOUNT
        } else {
            MetricName::DISK
        };

        let (a, b, c, d) = tokio::join!(
            self.fetch(resource, names[0], window),
            self.fetch(resource, names[1], window),
            self.fetch(resource, names[2], window),
            self.fetch(resource, names[3], window),
        );

        let mut series = BTreeMap::new();
        for (name, fetched) in names.into_iter().zip([a, b, c, d]) {
            if let Some(s) = fetched {
                series.insert(name, s);
            }
        }

        let sample = if resource.is_storage_account() {
            resolve_account(resource, &series)
        } else {
            resolve_disk(&series)
        };

        if sample.data_points_collected > 0 {
            return sample;
        }

        let fallback = fallback_usage(resource, tier);
        debug!(
            resource_id = %resource.resource_id,
            source = ?fallback.source,
            "No telemetry in window, using estimated usage"
        );
        fallback
    }

    async fn fetch(
        &self,
        resource: &ResourceDescriptor,
        metric: MetricName,
        window: &AnalysisWindow,
    ) -> Option<TimeSeries> {
        match self.metrics.fetch_metric(&resource.resource_id, metric, window).await {
            Ok(Some(series)) if series.data_points() > 0 => Some(series),
            Ok(_) => {
                debug!(resource_id = %resource.resource_id, metric = %metric, "Metric has no data");
                None
            }
            Err(e) => {
                debug!(
                    resource_id = %resource.resource_id,
                    metric = %metric,
                    error = %e,
                    "Metric unavailable, defaulting to zero"
                );
                None
            }
        }
    }
}

fn missing(names: &[MetricName], series: &BTreeMap<MetricName, TimeSeries>) -> Vec<MetricName> {
    names.iter().copied().filter(|n| !series.contains_key(n)).collect()
}

fn data_points(series: &BTreeMap<MetricName, TimeSeries>) -> u32 {
    series.values().map(TimeSeries::data_points).sum()
}

fn mean(series: &BTreeMap<MetricName, TimeSeries>, name: MetricName) -> f64 {
    series.get(&name).and_then(TimeSeries::mean_average).unwrap_or(0.0)
}

/// Peak of one series: its largest maximum, else the average proxy
fn series_peak(series: &TimeSeries) -> f64 {
    series
        .max_maximum()
        .unwrap_or_else(|| series.mean_average().unwrap_or(0.0) * PEAK_TO_AVERAGE_RATIO)
}

/// Combined peak of a read and a write series
///
/// When every present series carries maxima the peak is the largest point-wise
/// sum. Otherwise each series is resolved on its own and the peaks are added.
fn combined_peak(a: Option<&TimeSeries>, b: Option<&TimeSeries>) -> f64 {
    let present: Vec<&TimeSeries> = [a, b].into_iter().flatten().collect();

    if !present.is_empty() && present.iter().all(|s| s.max_maximum().is_some()) {
        let mut by_time: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for series in &present {
            for point in &series.points {
                if let Some(max) = point.maximum {
                    *by_time.entry(point.timestamp).or_default() += max;
                }
            }
        }
        return by_time.into_values().fold(0.0, f64::max);
    }

    present.into_iter().map(series_peak).sum()
}

/// Measured disk usage from read/write operation and byte series
pub fn resolve_disk(series: &BTreeMap<MetricName, TimeSeries>) -> UsageSample {
    let avg_read_iops = mean(series, MetricName::ReadOps);
    let avg_write_iops = mean(series, MetricName::WriteOps);
    let avg_iops = avg_read_iops + avg_write_iops;

    let avg_bytes = mean(series, MetricName::ReadBytes) + mean(series, MetricName::WriteBytes);
    let avg_throughput_mbps = avg_bytes / BYTES_PER_MB;

    let peak_iops = combined_peak(
        series.get(&MetricName::ReadOps),
        series.get(&MetricName::WriteOps),
    )
    .max(avg_iops);

    let peak_bytes = combined_peak(
        series.get(&MetricName::ReadBytes),
        series.get(&MetricName::WriteBytes),
    );
    let peak_throughput_mbps = (peak_bytes / BYTES_PER_MB).max(avg_throughput_mbps);

    UsageSample {
        avg_read_iops,
        avg_write_iops,
        peak_iops,
        avg_throughput_mbps,
        peak_throughput_mbps,
        transactions: 0,
        ingress_bytes: 0,
        egress_bytes: 0,
        used_capacity_gb: 0.0,
        data_points_collected: data_points(series),
        missing_metrics: missing(&MetricName::DISK, series),
        source: UsageSource::Measured,
    }
}

/// Measured storage-account usage; capacity falls back to the provisioned size
pub fn resolve_account(
    resource: &ResourceDescriptor,
    series: &BTreeMap<MetricName, TimeSeries>,
) -> UsageSample {
    let total = |name: MetricName| -> u64 {
        series
            .get(&name)
            .map(|s| s.sum_total().max(0.0).round() as u64)
            .unwrap_or(0)
    };

    let used_capacity_gb = series
        .get(&MetricName::UsedCapacity)
        .and_then(TimeSeries::mean_average)
        .map(|bytes| bytes / BYTES_PER_GB)
        .unwrap_or(resource.size_gb as f64);

    UsageSample {
        avg_read_iops: 0.0,
        avg_write_iops: 0.0,
        peak_iops: 0.0,
        avg_throughput_mbps: 0.0,
        peak_throughput_mbps: 0.0,
        transactions: total(MetricName::Transactions),
        ingress_bytes: total(MetricName::Ingress),
        egress_bytes: total(MetricName::Egress),
        used_capacity_gb,
        data_points_collected: data_points(series),
        missing_metrics: missing(&MetricName::ACCOUNT, series),
        source: UsageSource::Measured,
    }
}

/// Synthesized usage for a resource with no telemetry in the window
pub fn fallback_usage(resource: &ResourceDescriptor, tier: &TierSpec) -> UsageSample {
    let (reason, avg_fraction, peak_fraction) = match resource.attachment() {
        None => {
            let mut sample =
                UsageSample::idle(FallbackReason::TelemetryUnavailable, &MetricName::ACCOUNT);
            sample.used_capacity_gb = resource.size_gb as f64;
            return sample;
        }
        Some(Attachment::Unattached) => {
            return UsageSample::idle(FallbackReason::Inactive, &MetricName::DISK);
        }
        Some(Attachment::Attached { power_state, .. }) if power_state.is_powered_off() => (
            FallbackReason::HostStopped,
            HOST_STOPPED_AVERAGE_FRACTION,
            HOST_STOPPED_PEAK_FRACTION,
        ),
        Some(Attachment::Attached { .. }) => (
            FallbackReason::TelemetryUnavailable,
            NO_TELEMETRY_AVERAGE_FRACTION,
            NO_TELEMETRY_PEAK_FRACTION,
        ),
    };

    let baseline_iops = tier.baseline_iops as f64;
    let baseline_mbps = tier.baseline_throughput_mbps as f64;
    let avg_iops = baseline_iops * avg_fraction;

    UsageSample {
        avg_read_iops: avg_iops / 2.0,
        avg_write_iops: avg_iops / 2.0,
        peak_iops: baseline_iops * peak_fraction,
        avg_throughput_mbps: baseline_mbps * avg_fraction,
        peak_throughput_mbps: baseline_mbps * peak_fraction,
        transactions: 0,
        ingress_bytes: 0,
        egress_bytes: 0,
        used_capacity_gb: resource.size_gb as f64,
        data_points_collected: 0,
        missing_metrics: MetricName::DISK.to_vec(),
        source: UsageSource::Estimated { reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StorageClass, TierCatalog};
    use crate::models::{
        AccountDetails, DiskDetails, MetricPoint, PowerState, Redundancy, ResourceDetails,
    };
    use crate::providers::async_trait;
    use chrono::{Duration, TimeZone};

    /// Serves fixed series; metrics listed in `failing` return an error
    struct MockMetrics {
        series: BTreeMap<MetricName, TimeSeries>,
        failing: Vec<MetricName>,
    }

    #[async_trait]
    impl MetricsProvider for MockMetrics {
        async fn fetch_metric(
            &self,
            _resource_id: &str,
            metric: MetricName,
            _window: &AnalysisWindow,
        ) -> anyhow::Result<Option<TimeSeries>> {
            if self.failing.contains(&metric) {
                anyhow::bail!("backend error for {}", metric);
            }
            Ok(self.series.get(&metric).cloned())
        }
    }

    fn estimator(series: Vec<(MetricName, TimeSeries)>, failing: Vec<MetricName>) -> UsageEstimator {
        UsageEstimator::new(Arc::new(MockMetrics {
            series: series.into_iter().collect(),
            failing,
        }))
    }

    fn series(values: &[(f64, Option<f64>)]) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &(average, maximum))| MetricPoint {
                    timestamp: start + Duration::hours(i as i64),
                    average: Some(average),
                    maximum,
                    total: None,
                })
                .collect(),
        )
    }

    fn disk(attachment: Attachment) -> ResourceDescriptor {
        ResourceDescriptor {
            account_id: "sub-1".to_string(),
            account_name: "Production".to_string(),
            resource_group: "rg".to_string(),
            resource_id: "/disks/d1".to_string(),
            name: "d1".to_string(),
            region: "eastus".to_string(),
            class: StorageClass::PremiumSsd,
            tier: None,
            redundancy: Redundancy::Lrs,
            size_gb: 512,
            created_at: None,
            tags: BTreeMap::new(),
            details: ResourceDetails::ManagedDisk(DiskDetails { attachment }),
        }
    }

    fn running() -> Attachment {
        Attachment::Attached {
            vm_id: "vm-1".to_string(),
            power_state: PowerState::Running,
        }
    }

    fn p20() -> TierSpec {
        TierCatalog::builtin().spec_of("P20").unwrap().clone()
    }

    #[tokio::test]
    async fn test_measured_disk_usage() {
        let estimator = estimator(
            vec![
                (MetricName::ReadOps, series(&[(100.0, Some(300.0)), (200.0, Some(150.0))])),
                (MetricName::WriteOps, series(&[(50.0, Some(100.0)), (50.0, Some(400.0))])),
                (MetricName::ReadBytes, series(&[(BYTES_PER_MB * 4.0, None)])),
            ],
            vec![],
        );

        let usage = estimator
            .estimate(&disk(running()), &p20(), &AnalysisWindow::last_days(30))
            .await;

        assert!(usage.is_measured());
        assert_eq!(usage.avg_read_iops, 150.0);
        assert_eq!(usage.avg_write_iops, 50.0);
        // Point-wise sums are 400 and 550
        assert_eq!(usage.peak_iops, 550.0);
        assert_eq!(usage.avg_throughput_mbps, 4.0);
        assert_eq!(usage.peak_throughput_mbps, 8.0);
        assert_eq!(usage.data_points_collected, 5);
        assert_eq!(usage.missing_metrics, vec![MetricName::WriteBytes]);
    }

    #[tokio::test]
    async fn test_peak_with_maxima_on_one_series_only() {
        let estimator = estimator(
            vec![
                (MetricName::ReadOps, series(&[(20.0, Some(30.0))])),
                (MetricName::WriteOps, series(&[(400.0, None)])),
                (MetricName::ReadBytes, series(&[(BYTES_PER_MB, Some(BYTES_PER_MB * 3.0))])),
                (MetricName::WriteBytes, series(&[(BYTES_PER_MB * 5.0, None)])),
            ],
            vec![],
        );

        let usage = estimator
            .estimate(&disk(running()), &p20(), &AnalysisWindow::last_days(30))
            .await;

        assert_eq!(usage.avg_iops(), 420.0);
        // Read maximum plus twice the write average
        assert_eq!(usage.peak_iops, 830.0);
        assert_eq!(usage.avg_throughput_mbps, 6.0);
        assert_eq!(usage.peak_throughput_mbps, 13.0);
    }

    #[tokio::test]
    async fn test_failed_metric_defaults_to_zero() {
        let estimator = estimator(
            vec![(MetricName::ReadOps, series(&[(80.0, None)]))],
            vec![MetricName::WriteOps],
        );

        let usage = estimator
            .estimate(&disk(running()), &p20(), &AnalysisWindow::last_days(30))
            .await;

        assert!(usage.is_measured());
        assert_eq!(usage.avg_iops(), 80.0);
        assert_eq!(usage.peak_iops, 160.0);
        assert!(!usage.has_metric(MetricName::WriteOps));
        assert!(usage.has_metric(MetricName::ReadOps));
    }

    #[tokio::test]
    async fn test_unattached_disk_without_telemetry_is_idle() {
        let usage = estimator(vec![], vec![])
            .estimate(&disk(Attachment::Unattached), &p20(), &AnalysisWindow::last_days(30))
            .await;

        assert_eq!(
            usage.source,
            UsageSource::Estimated { reason: FallbackReason::Inactive }
        );
        assert_eq!(usage.avg_iops(), 0.0);
        assert_eq!(usage.peak_iops, 0.0);
    }

    #[tokio::test]
    async fn test_stopped_host_uses_low_fractions() {
        let attachment = Attachment::Attached {
            vm_id: "vm-1".to_string(),
            power_state: PowerState::Deallocated,
        };
        let usage = estimator(vec![], vec![MetricName::ReadOps])
            .estimate(&disk(attachment), &p20(), &AnalysisWindow::last_days(30))
            .await;

        assert_eq!(
            usage.source,
            UsageSource::Estimated { reason: FallbackReason::HostStopped }
        );
        assert!((usage.avg_iops() - 2300.0 * 0.05).abs() < 1e-9);
        assert!((usage.peak_iops - 2300.0 * 0.15).abs() < 1e-9);
        assert!((usage.peak_throughput_mbps - 150.0 * 0.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_running_host_without_telemetry_uses_conservative_fractions() {
        let usage = estimator(vec![], vec![])
            .estimate(&disk(running()), &p20(), &AnalysisWindow::last_days(30))
            .await;

        assert_eq!(
            usage.source,
            UsageSource::Estimated { reason: FallbackReason::TelemetryUnavailable }
        );
        assert!((usage.avg_iops() - 460.0).abs() < 1e-9);
        assert!((usage.peak_iops - 920.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_account_usage_resolution() {
        let mut account = disk(running());
        account.class = StorageClass::ObjectStorage;
        account.size_gb = 250;
        account.details = ResourceDetails::StorageAccount(AccountDetails {
            lifecycle_policy: false,
            https_only: true,
            allow_public_access: false,
            min_tls_version: "TLS1_2".to_string(),
        });

        let tx = TimeSeries::new(vec![
            MetricPoint { timestamp: Utc::now(), average: None, maximum: None, total: Some(1200.0) },
            MetricPoint { timestamp: Utc::now(), average: None, maximum: None, total: Some(300.0) },
        ]);
        let hot = TierCatalog::builtin().spec_of("Hot").unwrap().clone();

        let usage = estimator(vec![(MetricName::Transactions, tx)], vec![])
            .estimate(&account, &hot, &AnalysisWindow::last_days(30))
            .await;

        assert!(usage.has_metric(MetricName::Transactions));
        assert_eq!(usage.transactions, 1500);
        assert_eq!(usage.used_capacity_gb, 250.0);
        assert!(!usage.has_metric(MetricName::UsedCapacity));

        let silent = estimator(vec![], vec![])
            .estimate(&account, &hot, &AnalysisWindow::last_days(30))
            .await;
        assert!(!silent.is_measured());
        assert_eq!(silent.used_capacity_gb, 250.0);
        assert_eq!(silent.transactions, 0);
    }
}
