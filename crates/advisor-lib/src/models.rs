//! Core data models for the storage advisor

use crate::catalog::StorageClass;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Replication scheme of a disk or storage account
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Redundancy {
    #[default]
    Lrs,
    Zrs,
    Grs,
    RaGrs,
    Gzrs,
    RaGzrs,
}

impl Redundancy {
    /// Returns true for replication schemes that copy data to a paired region
    pub fn is_geo(&self) -> bool {
        matches!(
            self,
            Redundancy::Grs | Redundancy::RaGrs | Redundancy::Gzrs | Redundancy::RaGzrs
        )
    }

    /// Cheapest non-geo scheme that keeps the same in-region durability
    pub fn regional_equivalent(&self) -> Redundancy {
        match self {
            Redundancy::Gzrs | Redundancy::RaGzrs | Redundancy::Zrs => Redundancy::Zrs,
            _ => Redundancy::Lrs,
        }
    }

    pub fn all() -> [Redundancy; 6] {
        [
            Redundancy::Lrs,
            Redundancy::Zrs,
            Redundancy::Grs,
            Redundancy::RaGrs,
            Redundancy::Gzrs,
            Redundancy::RaGzrs,
        ]
    }
}

impl fmt::Display for Redundancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Redundancy::Lrs => "LRS",
            Redundancy::Zrs => "ZRS",
            Redundancy::Grs => "GRS",
            Redundancy::RaGrs => "RA-GRS",
            Redundancy::Gzrs => "GZRS",
            Redundancy::RaGzrs => "RA-GZRS",
        };
        f.write_str(label)
    }
}

/// Power state of the VM a disk is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Running,
    Stopped,
    Deallocated,
    /// Host state could not be determined
    NotApplicable,
}

impl PowerState {
    /// Stopped or deallocated hosts; an unknown state never counts as off
    pub fn is_powered_off(&self) -> bool {
        matches!(self, PowerState::Stopped | PowerState::Deallocated)
    }
}

/// Attachment state of a managed disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Attachment {
    Unattached,
    Attached { vm_id: String, power_state: PowerState },
}

/// Disk-specific attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskDetails {
    pub attachment: Attachment,
}

/// Storage-account-specific attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    #[serde(default)]
    pub lifecycle_policy: bool,
    #[serde(default = "default_true")]
    pub https_only: bool,
    #[serde(default)]
    pub allow_public_access: bool,
    #[serde(default = "default_tls")]
    pub min_tls_version: String,
}

fn default_true() -> bool {
    true
}

fn default_tls() -> String {
    "TLS1_2".to_string()
}

/// Kind-specific part of a resource descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDetails {
    ManagedDisk(DiskDetails),
    StorageAccount(AccountDetails),
}

/// One billable storage resource, snapshotted for a single analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub account_name: String,
    pub resource_group: String,
    pub resource_id: String,
    pub name: String,
    pub region: String,
    pub class: StorageClass,
    /// Explicit tier id; derived from size and class when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default)]
    pub redundancy: Redundancy,
    pub size_gb: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub details: ResourceDetails,
}

impl ResourceDescriptor {
    pub fn is_storage_account(&self) -> bool {
        matches!(self.details, ResourceDetails::StorageAccount(_))
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match &self.details {
            ResourceDetails::ManagedDisk(disk) => Some(&disk.attachment),
            ResourceDetails::StorageAccount(_) => None,
        }
    }

    /// Look up a tag value, ignoring key case
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Metrics requested from the metrics provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    ReadOps,
    WriteOps,
    ReadBytes,
    WriteBytes,
    UsedCapacity,
    Transactions,
    Ingress,
    Egress,
}

impl MetricName {
    pub const DISK: [MetricName; 4] = [
        MetricName::ReadOps,
        MetricName::WriteOps,
        MetricName::ReadBytes,
        MetricName::WriteBytes,
    ];

    pub const ACCOUNT: [MetricName; 4] = [
        MetricName::Transactions,
        MetricName::Ingress,
        MetricName::Egress,
        MetricName::UsedCapacity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ReadOps => "read_ops",
            MetricName::WriteOps => "write_ops",
            MetricName::ReadBytes => "read_bytes",
            MetricName::WriteBytes => "write_bytes",
            MetricName::UsedCapacity => "used_capacity",
            MetricName::Transactions => "transactions",
            MetricName::Ingress => "ingress",
            MetricName::Egress => "egress",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated telemetry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl MetricPoint {
    pub fn has_value(&self) -> bool {
        self.average.is_some() || self.maximum.is_some() || self.total.is_some()
    }
}

/// Time series returned by the metrics provider for one metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub points: Vec<MetricPoint>,
}

impl TimeSeries {
    pub fn new(points: Vec<MetricPoint>) -> Self {
        Self { points }
    }

    /// Number of points that carry any value
    pub fn data_points(&self) -> u32 {
        self.points.iter().filter(|p| p.has_value()).count() as u32
    }

    pub fn mean_average(&self) -> Option<f64> {
        let values: Vec<f64> = self.points.iter().filter_map(|p| p.average).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    pub fn max_maximum(&self) -> Option<f64> {
        self.points
            .iter()
            .filter_map(|p| p.maximum)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    /// Sum of totals, falling back to averages for points without a total
    pub fn sum_total(&self) -> f64 {
        self.points
            .iter()
            .filter_map(|p| p.total.or(p.average))
            .sum()
    }
}

/// Analysis window over which usage is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(days as i64),
            end,
        }
    }

    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    pub fn days(&self) -> f64 {
        (self.end - self.start).num_seconds().max(0) as f64 / 86_400.0
    }
}

/// Why a usage sample was estimated instead of measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Unattached or never active
    Inactive,
    /// Attached to a powered-off host
    HostStopped,
    /// Active resource with no telemetry in the window
    TelemetryUnavailable,
}

/// Whether usage came from telemetry or from the fallback policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum UsageSource {
    Measured,
    Estimated { reason: FallbackReason },
}

impl UsageSource {
    pub fn is_measured(&self) -> bool {
        matches!(self, UsageSource::Measured)
    }
}

/// Per-resource usage aggregate for one analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub avg_read_iops: f64,
    pub avg_write_iops: f64,
    pub peak_iops: f64,
    pub avg_throughput_mbps: f64,
    pub peak_throughput_mbps: f64,
    pub transactions: u64,
    pub ingress_bytes: u64,
    pub egress_bytes: u64,
    pub used_capacity_gb: f64,
    pub data_points_collected: u32,
    /// Metrics that were unavailable for the window and defaulted to zero
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_metrics: Vec<MetricName>,
    pub source: UsageSource,
}

impl UsageSample {
    /// Zeroed estimated sample; every metric is reported missing
    pub fn idle(reason: FallbackReason, metrics: &[MetricName]) -> Self {
        Self {
            avg_read_iops: 0.0,
            avg_write_iops: 0.0,
            peak_iops: 0.0,
            avg_throughput_mbps: 0.0,
            peak_throughput_mbps: 0.0,
            transactions: 0,
            ingress_bytes: 0,
            egress_bytes: 0,
            used_capacity_gb: 0.0,
            data_points_collected: 0,
            missing_metrics: metrics.to_vec(),
            source: UsageSource::Estimated { reason },
        }
    }

    pub fn avg_iops(&self) -> f64 {
        self.avg_read_iops + self.avg_write_iops
    }

    pub fn is_measured(&self) -> bool {
        self.source.is_measured()
    }

    /// Whether a metric contributed real telemetry to this sample
    pub fn has_metric(&self, metric: MetricName) -> bool {
        self.is_measured() && !self.missing_metrics.contains(&metric)
    }
}

/// Recommended action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DecommissionCandidate,
    DowngradeToCapacityTier,
    Downgrade,
    RetainNoSuitableTier,
    Retain,
    AccessTierChange,
    RedundancyDowngrade,
    LifecyclePolicy,
    ReservedCapacity,
    TagCompliance,
    SecurityPosture,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::DecommissionCandidate => "decommission_candidate",
            ActionKind::DowngradeToCapacityTier => "downgrade_to_capacity_tier",
            ActionKind::Downgrade => "downgrade",
            ActionKind::RetainNoSuitableTier => "retain_no_suitable_tier",
            ActionKind::Retain => "retain",
            ActionKind::AccessTierChange => "access_tier_change",
            ActionKind::RedundancyDowngrade => "redundancy_downgrade",
            ActionKind::LifecyclePolicy => "lifecycle_policy",
            ActionKind::ReservedCapacity => "reserved_capacity",
            ActionKind::TagCompliance => "tag_compliance",
            ActionKind::SecurityPosture => "security_posture",
        }
    }

    /// Actions that can carry a cost saving when taken
    pub fn is_actionable(&self) -> bool {
        !matches!(
            self,
            ActionKind::Retain
                | ActionKind::RetainNoSuitableTier
                | ActionKind::TagCompliance
                | ActionKind::SecurityPosture
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let kinds = [
            ActionKind::DecommissionCandidate,
            ActionKind::DowngradeToCapacityTier,
            ActionKind::Downgrade,
            ActionKind::RetainNoSuitableTier,
            ActionKind::Retain,
            ActionKind::AccessTierChange,
            ActionKind::RedundancyDowngrade,
            ActionKind::LifecyclePolicy,
            ActionKind::ReservedCapacity,
            ActionKind::TagCompliance,
            ActionKind::SecurityPosture,
        ];
        kinds
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown recommendation kind '{}'", s))
    }
}

/// Where the current monthly cost came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    Billed,
    Estimated,
}

/// One proposed action for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub account_id: String,
    pub account_name: String,
    pub resource_id: String,
    pub resource_name: String,
    pub region: String,
    pub kind: ActionKind,
    pub current_tier: String,
    pub target_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_redundancy: Option<Redundancy>,
    pub current_monthly_cost: f64,
    pub projected_monthly_cost: f64,
    pub monthly_savings: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_utilization_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_utilization_pct: Option<f64>,
    pub usage_source: UsageSource,
    pub cost_basis: CostBasis,
    pub pricing_fallback: bool,
    pub reason: String,
}

/// Everything the engine concluded about one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAssessment {
    pub resource_id: String,
    pub usage: UsageSample,
    pub recommendations: Vec<Recommendation>,
}

impl ResourceAssessment {
    /// First recommendation priced in the default region instead of the resource's own
    pub fn pricing_fallback(&self) -> Option<&Recommendation> {
        self.recommendations.iter().find(|r| r.pricing_fallback)
    }
}

/// Round a money amount to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Convert a money amount to integer cents
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redundancy_regional_equivalent() {
        assert_eq!(Redundancy::Grs.regional_equivalent(), Redundancy::Lrs);
        assert_eq!(Redundancy::RaGrs.regional_equivalent(), Redundancy::Lrs);
        assert_eq!(Redundancy::Gzrs.regional_equivalent(), Redundancy::Zrs);
        assert!(!Redundancy::Zrs.is_geo());
    }

    #[test]
    fn test_power_state_not_applicable_is_not_off() {
        assert!(PowerState::Stopped.is_powered_off());
        assert!(PowerState::Deallocated.is_powered_off());
        assert!(!PowerState::NotApplicable.is_powered_off());
        assert!(!PowerState::Running.is_powered_off());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = r#"{
            "account_id": "sub-1",
            "account_name": "Production",
            "resource_group": "rg-data",
            "resource_id": "/disks/data-01",
            "name": "data-01",
            "region": "eastus",
            "class": "premium_ssd",
            "size_gb": 128,
            "tags": {"Owner": "platform"},
            "details": {
                "kind": "managed_disk",
                "attachment": {"state": "attached", "vm_id": "vm-1", "power_state": "deallocated"}
            }
        }"#;

        let descriptor: ResourceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.redundancy, Redundancy::Lrs);
        assert_eq!(descriptor.tag("owner"), Some("platform"));
        match descriptor.attachment() {
            Some(Attachment::Attached { power_state, .. }) => {
                assert!(power_state.is_powered_off())
            }
            other => panic!("unexpected attachment {:?}", other),
        }
    }

    #[test]
    fn test_time_series_aggregates() {
        let now = Utc::now();
        let series = TimeSeries::new(vec![
            MetricPoint { timestamp: now, average: Some(10.0), maximum: Some(40.0), total: None },
            MetricPoint { timestamp: now, average: Some(20.0), maximum: Some(25.0), total: None },
            MetricPoint { timestamp: now, average: None, maximum: None, total: None },
        ]);

        assert_eq!(series.data_points(), 2);
        assert_eq!(series.mean_average(), Some(15.0));
        assert_eq!(series.max_maximum(), Some(40.0));
        assert_eq!(series.sum_total(), 30.0);
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!("downgrade".parse::<ActionKind>().unwrap(), ActionKind::Downgrade);
        assert_eq!(
            "Decommission_Candidate".parse::<ActionKind>().unwrap(),
            ActionKind::DecommissionCandidate
        );
        assert!("bogus".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(73.604), 73.6);
        assert_eq!(to_cents(73.60), 7360);
    }
}
