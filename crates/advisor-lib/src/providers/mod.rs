//! Data providers for an analysis run
//!
//! The engine reads its inputs through three narrow traits: a resource
//! directory (what exists), a metrics provider (how it was used) and a billing
//! provider (what it actually cost). Each can be backed by a cloud API, a
//! snapshot file or a test double.

mod inventory;
mod retry;

#[cfg(test)]
mod tests;

pub use inventory::{InventoryProvider, InventoryScope, InventorySnapshot};
pub use retry::{RetryPolicy, RetryingMetricsProvider};

use crate::models::{AnalysisWindow, MetricName, ResourceDescriptor, TimeSeries};
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use async_trait::async_trait;

/// Unit of enumeration, typically one subscription or billing account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub id: String,
    pub name: String,
}

/// Enumerates resources visible to the engine
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// List every scope the caller can read
    async fn list_scopes(&self) -> Result<Vec<Scope>>;

    /// List billable storage resources inside one scope
    async fn list_resources(&self, scope: &Scope) -> Result<Vec<ResourceDescriptor>>;
}

/// Supplies telemetry for a resource
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Fetch one metric over the window; `Ok(None)` means the metric does not exist
    async fn fetch_metric(
        &self,
        resource_id: &str,
        metric: MetricName,
        window: &AnalysisWindow,
    ) -> Result<Option<TimeSeries>>;
}

/// Supplies actual billed cost for a resource
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Billed amount for the window, or `None` when no billing data exists
    async fn actual_cost(&self, resource_id: &str, window: &AnalysisWindow) -> Result<Option<f64>>;
}

/// Billing provider for environments without cost data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBilling;

#[async_trait]
impl BillingProvider for NoBilling {
    async fn actual_cost(&self, _resource_id: &str, _window: &AnalysisWindow) -> Result<Option<f64>> {
        Ok(None)
    }
}
