//! Snapshot-backed provider
//!
//! Serves scopes, resources, telemetry and billing from one JSON document so a
//! run can be reproduced offline.

use super::{async_trait, BillingProvider, MetricsProvider, ResourceDirectory, Scope};
use crate::models::{AnalysisWindow, MetricName, ResourceDescriptor, TimeSeries};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// One scope in a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryScope {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
    /// Replays an enumeration failure for this scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full inventory document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub scopes: Vec<InventoryScope>,
    /// resource id -> metric -> series
    #[serde(default)]
    pub metrics: BTreeMap<String, BTreeMap<MetricName, TimeSeries>>,
    /// resource id -> billed amount over the analysis window
    #[serde(default)]
    pub billing: BTreeMap<String, f64>,
}

/// Directory, metrics and billing provider over an [`InventorySnapshot`]
#[derive(Debug, Clone)]
pub struct InventoryProvider {
    snapshot: InventorySnapshot,
}

impl InventoryProvider {
    pub fn new(mut snapshot: InventorySnapshot) -> Self {
        // Resources inherit their scope's identity unless they carry their own
        for scope in &mut snapshot.scopes {
            for resource in &mut scope.resources {
                if resource.account_id.is_empty() {
                    resource.account_id = scope.id.clone();
                }
                if resource.account_name.is_empty() {
                    resource.account_name = if scope.name.is_empty() {
                        scope.id.clone()
                    } else {
                        scope.name.clone()
                    };
                }
            }
        }
        Self { snapshot }
    }

    /// Read and parse a snapshot file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read inventory {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid inventory {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: InventorySnapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &InventorySnapshot {
        &self.snapshot
    }

    pub fn resource_count(&self) -> usize {
        self.snapshot.scopes.iter().map(|s| s.resources.len()).sum()
    }
}

#[async_trait]
impl ResourceDirectory for InventoryProvider {
    async fn list_scopes(&self) -> Result<Vec<Scope>> {
        Ok(self
            .snapshot
            .scopes
            .iter()
            .map(|s| Scope {
                id: s.id.clone(),
                name: if s.name.is_empty() { s.id.clone() } else { s.name.clone() },
            })
            .collect())
    }

    async fn list_resources(&self, scope: &Scope) -> Result<Vec<ResourceDescriptor>> {
        let entry = self
            .snapshot
            .scopes
            .iter()
            .find(|s| s.id == scope.id)
            .ok_or_else(|| anyhow!("Unknown scope {}", scope.id))?;

        if let Some(error) = &entry.error {
            return Err(anyhow!("Failed to enumerate scope {}: {}", scope.id, error));
        }

        Ok(entry.resources.clone())
    }
}

#[async_trait]
impl MetricsProvider for InventoryProvider {
    async fn fetch_metric(
        &self,
        resource_id: &str,
        metric: MetricName,
        window: &AnalysisWindow,
    ) -> Result<Option<TimeSeries>> {
        let Some(series) = self
            .snapshot
            .metrics
            .get(resource_id)
            .and_then(|metrics| metrics.get(&metric))
        else {
            return Ok(None);
        };

        let points: Vec<_> = series
            .points
            .iter()
            .filter(|p| p.timestamp >= window.start && p.timestamp <= window.end)
            .cloned()
            .collect();

        debug!(
            resource_id = %resource_id,
            metric = %metric,
            points = points.len(),
            "Served metric from inventory"
        );

        Ok(Some(TimeSeries::new(points)))
    }
}

#[async_trait]
impl BillingProvider for InventoryProvider {
    async fn actual_cost(&self, resource_id: &str, _window: &AnalysisWindow) -> Result<Option<f64>> {
        Ok(self.snapshot.billing.get(resource_id).copied())
    }
}
