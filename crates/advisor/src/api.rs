//! HTTP API for health checks, Prometheus metrics and analysis reports

use crate::state::{HealthStatus, ReportStore};
use advisor_lib::{
    ActionKind, AdvisorMetrics, AnalysisWindow, Recommendation, RunOutcome, ScopeWarning, Summary,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: ReportStore,
    pub metrics: AdvisorMetrics,
}

impl AppState {
    pub fn new(store: ReportStore, metrics: AdvisorMetrics) -> Self {
        Self { store, metrics }
    }
}

/// Filters for the recommendations listing
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    /// Account id or name, case-insensitive
    pub account: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub generated_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub count: usize,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub generated_at: DateTime<Utc>,
    pub window: AnalysisWindow,
    pub outcome: RunOutcome,
    pub summary: Summary,
    pub scope_warnings: Vec<ScopeWarning>,
    pub skipped_resources: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn no_report() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "No analysis report is available yet",
    )
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.store.health().await;

    let status_code = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once a report exists, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.store.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Response {
    let kind = match query.kind.as_deref().map(str::parse::<ActionKind>) {
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e),
        Some(Ok(kind)) => Some(kind),
        None => None,
    };

    let Some(report) = state.store.latest().await else {
        return no_report();
    };

    let recommendations: Vec<Recommendation> = report
        .recommendations()
        .filter(|r| match &query.account {
            Some(account) => {
                r.account_id.eq_ignore_ascii_case(account)
                    || r.account_name.eq_ignore_ascii_case(account)
            }
            None => true,
        })
        .filter(|r| kind.map_or(true, |k| r.kind == k))
        .cloned()
        .collect();

    Json(RecommendationsResponse {
        generated_at: report.generated_at,
        outcome: report.outcome,
        count: recommendations.len(),
        recommendations,
    })
    .into_response()
}

async fn summary(State(state): State<Arc<AppState>>) -> Response {
    let Some(report) = state.store.latest().await else {
        return no_report();
    };

    Json(SummaryResponse {
        generated_at: report.generated_at,
        window: report.window,
        outcome: report.outcome,
        summary: report.summary.clone(),
        scope_warnings: report.scope_warnings.clone(),
        skipped_resources: report.skipped_resources,
    })
    .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/recommendations", get(recommendations))
        .route("/api/v1/summary", get(summary))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
