//! Analysis run orchestration
//!
//! One run enumerates every scope, evaluates each resource on a bounded set of
//! tokio tasks and aggregates once all of them have finished. A failed scope is
//! recorded as a warning, a panicked resource task is skipped, and only
//! configuration errors abort the run.


use crate::aggregate::{summarize, Summary};
use crate::config::EngineContext;
use crate::error::{AdvisorError, Result};
use crate::models::{AnalysisWindow, Recommendation, ResourceAssessment, ResourceDescriptor};
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::providers::{BillingProvider, MetricsProvider, NoBilling, ResourceDirectory};
use crate::rules::assess;
use crate::usage::UsageEstimator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// A scope that could not be enumerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeWarning {
    pub scope_id: String,
    pub scope_name: String,
    pub error: String,
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// At least one recommendation carries a saving
    Opportunities,
    /// Resources were analyzed and nothing needs to change
    NothingToRecommend,
    /// No resource could be analyzed
    NoUsableData,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Opportunities => "opportunities",
            RunOutcome::NothingToRecommend => "nothing_to_recommend",
            RunOutcome::NoUsableData => "no_usable_data",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub window: AnalysisWindow,
    pub outcome: RunOutcome,
    pub summary: Summary,
    /// Sorted by resource id
    pub assessments: Vec<ResourceAssessment>,
    #[serde(default)]
    pub scope_warnings: Vec<ScopeWarning>,
    /// Resources whose evaluation task panicked
    #[serde(default)]
    pub skipped_resources: usize,
}

impl AnalysisReport {
    pub fn recommendations(&self) -> impl Iterator<Item = &Recommendation> {
        self.assessments.iter().flat_map(|a| a.recommendations.iter())
    }
}

/// Runs analyses against a set of collaborators
pub struct Analyzer {
    context: Arc<EngineContext>,
    directory: Arc<dyn ResourceDirectory>,
    estimator: UsageEstimator,
    billing: Arc<dyn BillingProvider>,
    metrics: AdvisorMetrics,
    logger: StructuredLogger,
}

impl Analyzer {
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Analyze the configured window ending now
    pub async fn run(&self) -> Result<AnalysisReport> {
        self.run_window(AnalysisWindow::last_days(self.context.config.window_days))
            .await
    }

    pub async fn run_window(&self, window: AnalysisWindow) -> Result<AnalysisReport> {
        let start = Instant::now();

        let scopes = self
            .directory
            .list_scopes()
            .await
            .map_err(|e| AdvisorError::Directory(format!("{:#}", e)))?;
        self.logger
            .log_analysis_started(scopes.len(), self.context.config.window_days);

        let mut scope_warnings = Vec::new();
        let mut resources: Vec<ResourceDescriptor> = Vec::new();
        let mut seen = HashSet::new();

        for scope in &scopes {
            match self.directory.list_resources(scope).await {
                Ok(listed) => {
                    debug!(scope_id = %scope.id, resources = listed.len(), "Enumerated scope");
                    resources.extend(
                        listed
                            .into_iter()
                            .filter(|r| seen.insert(r.resource_id.clone())),
                    );
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    self.logger.log_scope_failed(&scope.id, &message);
                    self.metrics.inc_scope_failures();
                    scope_warnings.push(ScopeWarning {
                        scope_id: scope.id.clone(),
                        scope_name: scope.name.clone(),
                        error: message,
                    });
                }
            }
        }

        let (mut assessments, skipped_resources) = self.evaluate_all(resources, window).await?;
        assessments.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

        for assessment in &assessments {
            for rec in &assessment.recommendations {
                self.logger.log_recommendation(rec);
                self.metrics.inc_recommendation(rec.kind.as_str());
            }
            if let Some(rec) = assessment.pricing_fallback() {
                self.logger.log_pricing_fallback(&rec.resource_id, &rec.region);
                self.metrics.inc_pricing_fallbacks();
            }
        }

        let summary = summarize(&assessments);
        let outcome = if assessments.is_empty() {
            RunOutcome::NoUsableData
        } else if summary.monthly_savings > 0.0 {
            RunOutcome::Opportunities
        } else {
            RunOutcome::NothingToRecommend
        };

        let generated_at = Utc::now();
        let elapsed = start.elapsed().as_secs_f64();
        self.metrics
            .observe_run(elapsed, &summary, generated_at.timestamp());
        self.logger.log_analysis_completed(&summary, elapsed);

        Ok(AnalysisReport {
            generated_at,
            window,
            outcome,
            summary,
            assessments,
            scope_warnings,
            skipped_resources,
        })
    }

    async fn evaluate_all(
        &self,
        resources: Vec<ResourceDescriptor>,
        window: AnalysisWindow,
    ) -> Result<(Vec<ResourceAssessment>, usize)> {
        let semaphore = Arc::new(Semaphore::new(self.context.config.max_concurrent_resources));
        let mut tasks = JoinSet::new();

        for resource in resources {
            let semaphore = semaphore.clone();
            let context = self.context.clone();
            let estimator = self.estimator.clone();
            let billing = self.billing.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                evaluate_resource(&context, &estimator, billing.as_ref(), &resource, &window).await
            });
        }

        let mut assessments = Vec::new();
        let mut skipped = 0;

        // Barrier: aggregation waits for every task
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(assessment)) => assessments.push(assessment),
                Ok(Err(e)) => {
                    error!(error = %e, "Fatal configuration error, aborting run");
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Resource evaluation task failed, skipping resource");
                }
            }
        }

        Ok((assessments, skipped))
    }
}

async fn evaluate_resource(
    context: &EngineContext,
    estimator: &UsageEstimator,
    billing: &dyn BillingProvider,
    resource: &ResourceDescriptor,
    window: &AnalysisWindow,
) -> Result<ResourceAssessment> {
    let tier = context.catalog.current_tier(resource)?;
    let usage = estimator.estimate(resource, tier, window).await;

    let billed = match billing.actual_cost(&resource.resource_id, window).await {
        Ok(cost) => cost,
        Err(e) => {
            debug!(
                resource_id = %resource.resource_id,
                error = %e,
                "Billing data unavailable, using estimated cost"
            );
            None
        }
    };

    assess(resource, usage, billed, window, context)
}

/// Builder for [`Analyzer`]
pub struct AnalyzerBuilder {
    context: Option<Arc<EngineContext>>,
    directory: Option<Arc<dyn ResourceDirectory>>,
    metrics: Option<Arc<dyn MetricsProvider>>,
    billing: Arc<dyn BillingProvider>,
    instance: String,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            context: None,
            directory: None,
            metrics: None,
            billing: Arc::new(NoBilling),
            instance: "storage-advisor".to_string(),
        }
    }

    pub fn context(mut self, context: Arc<EngineContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn ResourceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn metrics_provider(mut self, metrics: Arc<dyn MetricsProvider>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn billing(mut self, billing: Arc<dyn BillingProvider>) -> Self {
        self.billing = billing;
        self
    }

    /// Instance name attached to structured log events
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn build(self) -> anyhow::Result<Analyzer> {
        let context = self
            .context
            .ok_or_else(|| anyhow::anyhow!("Engine context is required"))?;
        let directory = self
            .directory
            .ok_or_else(|| anyhow::anyhow!("Resource directory is required"))?;
        let metrics = self
            .metrics
            .ok_or_else(|| anyhow::anyhow!("Metrics provider is required"))?;

        Ok(Analyzer {
            context,
            directory,
            estimator: UsageEstimator::new(metrics),
            billing: self.billing,
            metrics: AdvisorMetrics::new(),
            logger: StructuredLogger::new(self.instance),
        })
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
