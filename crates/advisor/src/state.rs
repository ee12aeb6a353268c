//! Latest-report store and the health it implies
//!
//! The service is ready once one report has been published. Health degrades
//! when the latest run skipped scopes or resources, or failed while an older
//! report is still being served; it is unhealthy when runs fail and nothing
//! has ever been published.

use advisor_lib::AnalysisReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub runs_completed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub scope_warnings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct StoreInner {
    report: Option<Arc<AnalysisReport>>,
    last_error: Option<String>,
    runs_completed: u64,
}

/// Shared handle to the most recent analysis report
#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the served report and clear any previous failure
    pub async fn publish(&self, report: AnalysisReport) {
        let mut inner = self.inner.write().await;
        inner.report = Some(Arc::new(report));
        inner.last_error = None;
        inner.runs_completed += 1;
    }

    /// Record a failed run; the previous report keeps being served
    pub async fn record_failure(&self, error: impl Into<String>) {
        let mut inner = self.inner.write().await;
        inner.last_error = Some(error.into());
    }

    pub async fn latest(&self) -> Option<Arc<AnalysisReport>> {
        self.inner.read().await.report.clone()
    }

    pub async fn health(&self) -> HealthResponse {
        let inner = self.inner.read().await;
        let scope_warnings = inner
            .report
            .as_ref()
            .map(|r| r.scope_warnings.len())
            .unwrap_or(0);
        let skipped = inner
            .report
            .as_ref()
            .map(|r| r.skipped_resources)
            .unwrap_or(0);

        let status = match (&inner.report, &inner.last_error) {
            (None, Some(_)) => HealthStatus::Unhealthy,
            (Some(_), Some(_)) => HealthStatus::Degraded,
            _ if scope_warnings > 0 || skipped > 0 => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        };

        HealthResponse {
            status,
            runs_completed: inner.runs_completed,
            last_report_at: inner.report.as_ref().map(|r| r.generated_at),
            last_error: inner.last_error.clone(),
            scope_warnings,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let inner = self.inner.read().await;
        match (&inner.report, &inner.last_error) {
            (Some(_), _) => ReadinessResponse {
                ready: true,
                reason: None,
            },
            (None, Some(error)) => ReadinessResponse {
                ready: false,
                reason: Some(format!("Analysis failed: {}", error)),
            },
            (None, None) => ReadinessResponse {
                ready: false,
                reason: Some("First analysis has not completed".to_string()),
            },
        }
    }
}
