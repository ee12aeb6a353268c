//! Retry wrapper for flaky metrics backends

use super::{async_trait, MetricsProvider};
use crate::models::{AnalysisWindow, MetricName, TimeSeries};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff settings for metric fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let delay = self.initial_backoff_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

/// Retries failed fetches of an inner provider; `Ok(None)` is never retried
pub struct RetryingMetricsProvider {
    inner: Arc<dyn MetricsProvider>,
    policy: RetryPolicy,
}

impl RetryingMetricsProvider {
    pub fn new(inner: Arc<dyn MetricsProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl MetricsProvider for RetryingMetricsProvider {
    async fn fetch_metric(
        &self,
        resource_id: &str,
        metric: MetricName,
        window: &AnalysisWindow,
    ) -> Result<Option<TimeSeries>> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.fetch_metric(resource_id, metric, window).await {
                Ok(series) => return Ok(series),
                Err(e) if attempt < attempts => {
                    let backoff = self.policy.backoff_for(attempt);
                    warn!(
                        resource_id = %resource_id,
                        metric = %metric,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Metric fetch failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
