//! `job_search` tool: query external job boards through a search service

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::{JobSearchFilters, JobSummary};
use crate::error::{AppError, AppResult};
use crate::server::{Tool, ToolOutput};

/// Outcome of one search across the configured providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub jobs: Vec<JobSummary>,
    /// How many providers contributed results
    pub source_count: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Searches job boards and normalizes postings
#[async_trait]
pub trait JobSearchService: Send + Sync {
    async fn search(&self, query: &str, filters: &JobSearchFilters) -> AppResult<SearchOutcome>;
}

#[async_trait]
impl<S: JobSearchService + ?Sized> JobSearchService for std::sync::Arc<S> {
    async fn search(&self, query: &str, filters: &JobSearchFilters) -> AppResult<SearchOutcome> {
        (**self).search(query, filters).await
    }
}

#[derive(Debug, Deserialize)]
struct JobSearchParams {
    query: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    remote: Option<bool>,
    #[serde(default)]
    skills: Vec<String>,
}

/// The `job_search` tool
pub struct JobSearchTool<S> {
    service: S,
}

impl<S: JobSearchService> JobSearchTool<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: JobSearchService> Tool for JobSearchTool<S> {
    fn name(&self) -> &str {
        super::JOB_SEARCH
    }

    fn description(&self) -> &str {
        "Search external job boards/APIs, normalize, and store job postings"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language job search query"
                },
                "location": { "type": "string", "description": "Preferred location filter" },
                "remote": { "type": "boolean", "description": "Restrict to remote postings" },
                "skills": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of required skills"
                }
            },
            "required": ["query"]
        })
    }

    fn result_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "jobs": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "company": { "type": "string" },
                            "location": { "type": "string" },
                            "url": { "type": "string" }
                        }
                    }
                },
                "fetched_at": { "type": "string", "format": "date-time" },
                "source_count": { "type": "integer" }
            }
        })
    }

    async fn execute(&self, params: Value) -> AppResult<ToolOutput> {
        let params: JobSearchParams = super::decode_params(params)?;
        if params.query.trim().is_empty() {
            warn!("job_search called with an empty query");
            return Err(AppError::invalid_params("job_search requires a non-empty query"));
        }

        let filters = JobSearchFilters {
            location: params.location,
            remote: params.remote,
            skills: params.skills,
        };
        info!(query = %params.query, ?filters, "job_search request");

        let outcome = self.service.search(&params.query, &filters).await?;
        info!(
            jobs = outcome.jobs.len(),
            sources = outcome.source_count,
            "job_search completed"
        );

        let mut text = format!(
            "[job_search] fetched {} job(s) from {} source(s)\n",
            outcome.jobs.len(),
            outcome.source_count
        );
        for job in &outcome.jobs {
            text.push_str(&format!(
                "  - {} | {} at {} [{}]\n",
                job.id,
                job.title,
                job.company,
                job.location.as_deref().unwrap_or("unspecified")
            ));
        }

        let data = serde_json::to_value(&outcome)?;
        Ok(ToolOutput::new(text, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedService {
        outcome: SearchOutcome,
    }

    #[async_trait]
    impl JobSearchService for FixedService {
        async fn search(
            &self,
            _query: &str,
            _filters: &JobSearchFilters,
        ) -> AppResult<SearchOutcome> {
            Ok(self.outcome.clone())
        }
    }

    fn sample_outcome() -> SearchOutcome {
        SearchOutcome {
            jobs: vec![JobSummary {
                id: "j-1".into(),
                title: "Rust Engineer".into(),
                company: "Acme".into(),
                location: Some("Berlin".into()),
                url: None,
                description: String::new(),
                salary_min: None,
                salary_max: None,
                posted_at: None,
            }],
            source_count: 1,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let tool = JobSearchTool::new(FixedService {
            outcome: sample_outcome(),
        });
        let err = tool.execute(json!({"query": "  "})).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn test_search_renders_listing() {
        let tool = JobSearchTool::new(FixedService {
            outcome: sample_outcome(),
        });
        let out = tool.execute(json!({"query": "rust"})).await.unwrap();
        let text = out.text.unwrap();
        assert!(text.contains("j-1 | Rust Engineer at Acme [Berlin]"));
        assert_eq!(out.data["source_count"], 1);
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid() {
        let tool = JobSearchTool::new(FixedService {
            outcome: sample_outcome(),
        });
        let err = tool.execute(json!({"location": "Berlin"})).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidParams { .. }));
    }
}
