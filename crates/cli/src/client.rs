//! API client for the storage advisor service

use advisor_lib::{AnalysisWindow, Recommendation, RunOutcome, ScopeWarning, Summary};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the advisor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Recommendations from the latest report, optionally filtered
    pub async fn get_recommendations(
        &self,
        account: Option<&str>,
        kind: Option<&str>,
    ) -> Result<RecommendationList> {
        let mut url = self.url("api/v1/recommendations")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(account) = account {
                query.append_pair("account", account);
            }
            if let Some(kind) = kind {
                query.append_pair("kind", kind);
            }
        }
        // Drop the dangling `?` when no filter was given
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get(url).await
    }

    /// Totals of the latest report
    pub async fn get_summary(&self) -> Result<SummaryReport> {
        let url = self.url("api/v1/summary")?;
        self.get(url).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationList {
    pub generated_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub count: usize,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub window: AnalysisWindow,
    pub outcome: RunOutcome,
    pub summary: Summary,
    #[serde(default)]
    pub scope_warnings: Vec<ScopeWarning>,
    #[serde(default)]
    pub skipped_resources: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const RECOMMENDATIONS: &str = r#"{
        "generated_at": "2024-03-01T00:00:00Z",
        "outcome": "opportunities",
        "count": 1,
        "recommendations": [{
            "account_id": "sub-dev",
            "account_name": "Development",
            "resource_id": "/disks/scratch",
            "resource_name": "scratch",
            "region": "eastus",
            "kind": "decommission_candidate",
            "current_tier": "P20",
            "target_tier": null,
            "current_monthly_cost": 73.6,
            "projected_monthly_cost": 0.0,
            "monthly_savings": 73.6,
            "usage_source": {"source": "estimated", "reason": "inactive"},
            "cost_basis": "estimated",
            "pricing_fallback": false,
            "reason": "disk is not attached to any host"
        }]
    }"#;

    #[tokio::test]
    async fn test_get_recommendations_sends_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/recommendations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("account".into(), "Development".into()),
                Matcher::UrlEncoded("kind".into(), "decommission_candidate".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RECOMMENDATIONS)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let list = client
            .get_recommendations(Some("Development"), Some("decommission_candidate"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(list.count, 1);
        assert_eq!(list.outcome, RunOutcome::Opportunities);
        assert_eq!(list.recommendations[0].monthly_savings, 73.6);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/summary")
            .with_status(503)
            .with_body(r#"{"error": "No analysis report is available yet"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.get_summary().await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("503"));
        assert!(message.contains("No analysis report"));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
