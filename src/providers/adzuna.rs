//! Adzuna job board client
//!
//! Implements [`JobSearchService`] over the Adzuna search API. Postings
//! without a stable upstream id get a generated uuid so downstream tools
//! can still reference them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::AdzunaConfig;
use crate::domain::{JobSearchFilters, JobSummary};
use crate::error::{AppError, AppResult};
use crate::tools::{JobSearchService, SearchOutcome};

const DEFAULT_BASE_URL: &str = "https://api.adzuna.com";
const DEFAULT_COUNTRY: &str = "us";
const PAGE_SIZE: usize = 20;

/// Adzuna search API client
#[derive(Debug)]
pub struct AdzunaClient {
    http: reqwest::Client,
    app_id: String,
    app_key: String,
    country: String,
    base_url: String,
}

impl AdzunaClient {
    /// Build a client from configuration; both credentials must be present
    pub fn new(config: &AdzunaConfig) -> AppResult<Self> {
        let (app_id, app_key) = match (&config.app_id, &config.app_key) {
            (Some(id), Some(key)) => (id.clone(), key.clone()),
            _ => {
                return Err(AppError::application(
                    "adzuna: app_id and app_key are required",
                ))
            }
        };
        Ok(Self {
            http: reqwest::Client::new(),
            app_id,
            app_key,
            country: config
                .country
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    fn build_search_url(&self, query: &str, filters: &JobSearchFilters) -> AppResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/v1/api/jobs/{}/search/1",
            self.base_url, self.country
        ))
        .map_err(|err| AppError::application(format!("adzuna: bad base url: {}", err)))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("app_id", &self.app_id);
            pairs.append_pair("app_key", &self.app_key);
            pairs.append_pair("what", query);
            pairs.append_pair("results_per_page", &PAGE_SIZE.to_string());
            if let Some(location) = &filters.location {
                pairs.append_pair("where", location);
            }
            if filters.remote == Some(true) {
                // Remote approximation supported by the API
                pairs.append_pair("distance", "0");
                pairs.append_pair("where", "Remote");
            }
            if !filters.skills.is_empty() {
                pairs.append_pair("what_and", &filters.skills.join(" "));
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Posting>,
}

#[derive(Debug, Deserialize)]
struct Posting {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: DisplayName,
    #[serde(default)]
    location: DisplayName,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    salary_min: Option<f64>,
    #[serde(default)]
    salary_max: Option<f64>,
    #[serde(default)]
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayName {
    #[serde(default)]
    display_name: Option<String>,
}

impl Posting {
    fn into_summary(self) -> JobSummary {
        JobSummary {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: self.title,
            company: self.company.display_name.unwrap_or_default(),
            location: self.location.display_name,
            url: self.redirect_url,
            description: self.description,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            posted_at: self
                .created
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.with_timezone(&Utc)),
        }
    }
}

#[async_trait::async_trait]
impl JobSearchService for AdzunaClient {
    async fn search(&self, query: &str, filters: &JobSearchFilters) -> AppResult<SearchOutcome> {
        let url = self.build_search_url(query, filters)?;
        debug!(country = %self.country, "querying adzuna");

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "adzuna API error");
            return Err(AppError::tool(format!(
                "adzuna: API error ({}): {}",
                status,
                body.trim()
            )));
        }

        let payload: SearchResponse = response.json().await?;
        let jobs: Vec<JobSummary> = payload
            .results
            .into_iter()
            .map(Posting::into_summary)
            .collect();

        Ok(SearchOutcome {
            source_count: 1,
            jobs,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> AdzunaClient {
        AdzunaClient::new(&AdzunaConfig {
            app_id: Some("id".into()),
            app_key: Some("key".into()),
            country: Some("gb".into()),
        })
        .unwrap()
    }

    #[test]
    fn test_requires_credentials() {
        let err = AdzunaClient::new(&AdzunaConfig::default()).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_search_url_includes_filters() {
        let client = test_client();
        let filters = JobSearchFilters {
            location: Some("London".into()),
            remote: None,
            skills: vec!["rust".into(), "tokio".into()],
        };
        let url = client.build_search_url("backend engineer", &filters).unwrap();
        let query = url.query().unwrap();
        assert!(url.path().contains("/jobs/gb/search/1"));
        assert!(query.contains("what=backend+engineer"));
        assert!(query.contains("where=London"));
        assert!(query.contains("what_and=rust+tokio"));
    }

    #[test]
    fn test_remote_filter_overrides_location() {
        let client = test_client();
        let filters = JobSearchFilters {
            remote: Some(true),
            ..Default::default()
        };
        let url = client.build_search_url("rust", &filters).unwrap();
        assert!(url.query().unwrap().contains("where=Remote"));
    }

    #[test]
    fn test_posting_without_id_gets_uuid() {
        let posting: Posting = serde_json::from_value(serde_json::json!({
            "title": "Engineer",
            "company": {"display_name": "Acme"}
        }))
        .unwrap();
        let summary = posting.into_summary();
        assert!(Uuid::parse_str(&summary.id).is_ok());
        assert_eq!(summary.company, "Acme");
    }
}
