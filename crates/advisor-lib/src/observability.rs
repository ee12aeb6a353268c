//! Observability infrastructure for the storage advisor
//!
//! Provides:
//! - Prometheus metrics (run duration, resources analyzed, recommendations by kind, savings)
//! - Structured JSON logging with tracing

use crate::aggregate::Summary;
use crate::models::Recommendation;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for whole-run durations (in seconds)
const RUN_DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdvisorMetricsInner> = OnceLock::new();

struct AdvisorMetricsInner {
    analysis_duration_seconds: Histogram,
    analysis_runs: IntCounter,
    resources_analyzed: IntGauge,
    estimated_resources: IntGauge,
    recommendations: IntCounterVec,
    monthly_savings_dollars: Gauge,
    scope_failures: IntCounter,
    pricing_fallbacks: IntCounter,
    last_run_timestamp_seconds: IntGauge,
}

impl AdvisorMetricsInner {
    fn new() -> Self {
        Self {
            analysis_duration_seconds: register_histogram!(
                "storage_advisor_analysis_duration_seconds",
                "Time spent on one full analysis run",
                RUN_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_duration_seconds"),

            analysis_runs: register_int_counter!(
                "storage_advisor_analysis_runs_total",
                "Total number of completed analysis runs"
            )
            .expect("Failed to register analysis_runs"),

            resources_analyzed: register_int_gauge!(
                "storage_advisor_resources_analyzed",
                "Resources evaluated in the last run"
            )
            .expect("Failed to register resources_analyzed"),

            estimated_resources: register_int_gauge!(
                "storage_advisor_estimated_resources",
                "Resources in the last run whose usage was estimated instead of measured"
            )
            .expect("Failed to register estimated_resources"),

            recommendations: register_int_counter_vec!(
                "storage_advisor_recommendations_total",
                "Recommendations generated, by kind",
                &["kind"]
            )
            .expect("Failed to register recommendations"),

            monthly_savings_dollars: register_gauge!(
                "storage_advisor_monthly_savings_dollars",
                "Projected monthly savings found by the last run"
            )
            .expect("Failed to register monthly_savings_dollars"),

            scope_failures: register_int_counter!(
                "storage_advisor_scope_failures_total",
                "Scopes that could not be enumerated"
            )
            .expect("Failed to register scope_failures"),

            pricing_fallbacks: register_int_counter!(
                "storage_advisor_pricing_fallbacks_total",
                "Recommendations priced with the default region"
            )
            .expect("Failed to register pricing_fallbacks"),

            last_run_timestamp_seconds: register_int_gauge!(
                "storage_advisor_last_run_timestamp_seconds",
                "Unix time the last run completed"
            )
            .expect("Failed to register last_run_timestamp_seconds"),
        }
    }
}

/// Advisor metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct AdvisorMetrics {
    _private: (),
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdvisorMetricsInner {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new)
    }

    pub fn observe_run(&self, duration_secs: f64, summary: &Summary, completed_at: i64) {
        let inner = self.inner();
        inner.analysis_duration_seconds.observe(duration_secs);
        inner.analysis_runs.inc();
        inner.resources_analyzed.set(summary.resources_analyzed as i64);
        inner.estimated_resources.set(summary.estimated_resources as i64);
        inner.monthly_savings_dollars.set(summary.monthly_savings);
        inner.last_run_timestamp_seconds.set(completed_at);
    }

    pub fn inc_recommendation(&self, kind: &str) {
        self.inner().recommendations.with_label_values(&[kind]).inc();
    }

    pub fn inc_scope_failures(&self) {
        self.inner().scope_failures.inc();
    }

    pub fn inc_pricing_fallbacks(&self) {
        self.inner().pricing_fallbacks.inc();
    }
}

/// Structured logger for advisor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "advisor_started",
            instance = %self.instance,
            advisor_version = %version,
            "Storage advisor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "advisor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Storage advisor shutting down"
        );
    }

    pub fn log_analysis_started(&self, scopes: usize, window_days: u32) {
        info!(
            event = "analysis_started",
            instance = %self.instance,
            scopes = scopes,
            window_days = window_days,
            "Starting storage analysis"
        );
    }

    /// Log one recommendation; retains are only logged at debug level
    pub fn log_recommendation(&self, rec: &Recommendation) {
        if !rec.kind.is_actionable() {
            tracing::debug!(
                event = "recommendation_generated",
                instance = %self.instance,
                resource_id = %rec.resource_id,
                kind = %rec.kind,
                "Resource retained"
            );
            return;
        }

        info!(
            event = "recommendation_generated",
            instance = %self.instance,
            account_id = %rec.account_id,
            resource_id = %rec.resource_id,
            kind = %rec.kind,
            current_tier = %rec.current_tier,
            target_tier = ?rec.target_tier,
            current_monthly_cost = rec.current_monthly_cost,
            projected_monthly_cost = rec.projected_monthly_cost,
            monthly_savings = rec.monthly_savings,
            usage_source = ?rec.usage_source,
            "Generated storage recommendation"
        );
    }

    pub fn log_scope_failed(&self, scope_id: &str, error: &str) {
        warn!(
            event = "scope_failed",
            instance = %self.instance,
            scope_id = %scope_id,
            error = %error,
            "Scope could not be enumerated, continuing with remaining scopes"
        );
    }

    pub fn log_pricing_fallback(&self, resource_id: &str, region: &str) {
        warn!(
            event = "pricing_fallback",
            instance = %self.instance,
            resource_id = %resource_id,
            region = %region,
            "No prices for region, priced with default region"
        );
    }

    pub fn log_analysis_completed(&self, summary: &Summary, duration_secs: f64) {
        info!(
            event = "analysis_completed",
            instance = %self.instance,
            resources = summary.resources_analyzed,
            estimated_resources = summary.estimated_resources,
            recommendations = summary.recommendations,
            actionable = summary.actionable_recommendations,
            current_monthly_cost = summary.current_monthly_cost,
            monthly_savings = summary.monthly_savings,
            savings_pct = summary.savings_pct,
            duration_secs = duration_secs,
            "Storage analysis completed"
        );
    }
}
