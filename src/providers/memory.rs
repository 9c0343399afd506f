//! In-memory graph store
//!
//! Backs the keyword, analysis, directory, and graph-inspection traits when
//! no external graph database is configured. Search results are recorded
//! into the store so later tool calls can hydrate them by id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::domain::{JobSearchFilters, JobSummary, KeywordEntry, KeywordRecord, SheetRow};
use crate::error::{AppError, AppResult};
use crate::tools::{
    AnalysisService, GraphInspector, GraphRequest, JobDirectory, JobSearchService, KeywordStore,
    SearchOutcome,
};
use crate::tools::analysis::{AnalysisReport, AnalysisRequest, JobInsight};

/// Shared in-memory job and keyword storage
#[derive(Default)]
pub struct GraphStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    jobs: HashMap<String, JobSummary>,
    keywords: HashMap<String, Vec<KeywordEntry>>,
}

impl GraphStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record normalized postings so downstream tools can look them up
    pub fn record_jobs(&self, jobs: &[JobSummary]) {
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        for job in jobs {
            inner.jobs.insert(job.id.clone(), job.clone());
        }
        debug!(total = inner.jobs.len(), "graph store updated");
    }

    /// Number of stored jobs
    pub fn job_count(&self) -> usize {
        self.inner.lock().expect("graph store lock poisoned").jobs.len()
    }
}

#[async_trait]
impl KeywordStore for GraphStore {
    async fn persist(&self, records: &[KeywordRecord]) -> AppResult<()> {
        let mut inner = self.inner.lock().expect("graph store lock poisoned");
        for record in records {
            inner
                .keywords
                .entry(record.job_id.clone())
                .or_default()
                .extend(record.keywords.iter().cloned());
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisService for GraphStore {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisReport> {
        let inner = self.inner.lock().expect("graph store lock poisoned");

        // Unknown ids are skipped rather than rejected; the agent recovers
        // by running another search.
        let mut insights = Vec::new();
        for job_id in &request.job_ids {
            let Some(job) = inner.jobs.get(job_id) else {
                continue;
            };
            insights.push(JobInsight {
                job_id: job_id.clone(),
                summary: format!("{} at {}", job.title, job.company),
                keywords: inner.keywords.get(job_id).cloned().unwrap_or_default(),
                data: serde_json::to_value(job)?,
            });
        }

        let notes = match &request.profile {
            Some(profile) if !insights.is_empty() => format!(
                "compare against candidate profile ({} chars){}",
                profile.len(),
                request
                    .focus
                    .as_deref()
                    .map(|f| format!("; focus: {}", f))
                    .unwrap_or_default()
            ),
            _ => String::new(),
        };

        Ok(AnalysisReport {
            jobs: insights,
            generated_at: Utc::now(),
            notes,
        })
    }
}

#[async_trait]
impl JobDirectory for GraphStore {
    async fn rows_for(
        &self,
        job_ids: &[String],
        filter: &HashMap<String, String>,
    ) -> AppResult<Vec<SheetRow>> {
        let inner = self.inner.lock().expect("graph store lock poisoned");
        let mut rows = Vec::new();
        for job_id in job_ids {
            let Some(job) = inner.jobs.get(job_id) else {
                continue;
            };
            if !matches_filter(job, filter) {
                continue;
            }
            let notes = inner
                .keywords
                .get(job_id)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| e.value.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            rows.push(SheetRow {
                title: job.title.clone(),
                company: job.company.clone(),
                location: job.location.clone().unwrap_or_default(),
                url: job.url.clone().unwrap_or_default(),
                status: String::new(),
                color: String::new(),
                notes,
                updated_at: Utc::now(),
            });
        }
        Ok(rows)
    }
}

fn matches_filter(job: &JobSummary, filter: &HashMap<String, String>) -> bool {
    for (key, value) in filter {
        let matched = match key.as_str() {
            "location" => job
                .location
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&value.to_lowercase()),
            "company" => job.company.to_lowercase().contains(&value.to_lowercase()),
            "title" => job.title.to_lowercase().contains(&value.to_lowercase()),
            // Unknown filter keys never match anything.
            _ => false,
        };
        if !matched {
            return false;
        }
    }
    true
}

#[async_trait]
impl GraphInspector for GraphStore {
    async fn inspect(&self, request: &GraphRequest) -> AppResult<String> {
        let inner = self.inner.lock().expect("graph store lock poisoned");
        match request {
            GraphRequest::Query { .. } => Err(AppError::tool(
                "graph_tool: custom queries require an external graph backend",
            )),
            GraphRequest::JobContext { job_id } => {
                let Some(job) = inner.jobs.get(job_id) else {
                    return Ok("Query executed successfully but returned no rows".to_string());
                };
                let mut out = String::from("Results:\n");
                out.push_str(&"-".repeat(80));
                out.push('\n');
                out.push_str("Row 1:\n");
                out.push_str(&format!(
                    "  job: Node[Job] {}\n",
                    serde_json::to_string(job)?
                ));
                let keywords = inner.keywords.get(job_id).cloned().unwrap_or_default();
                out.push_str(&format!(
                    "  keywords: {}\n",
                    serde_json::to_string(&keywords)?
                ));
                Ok(out)
            }
            GraphRequest::LabelOverview => {
                let keyword_count: usize = inner.keywords.values().map(Vec::len).sum();
                let mut out = String::from("Results:\n");
                out.push_str(&"-".repeat(80));
                out.push('\n');
                out.push_str(&format!("  Job: {}\n", inner.jobs.len()));
                out.push_str(&format!("  Keyword: {}\n", keyword_count));
                Ok(out)
            }
        }
    }
}

/// Search service wrapper that records results into the graph store
///
/// Mirrors the server-side persistence step of a search: every normalized
/// posting becomes addressable by id for analysis and export.
pub struct RecordingSearchService<S> {
    inner: S,
    store: Arc<GraphStore>,
}

impl<S: JobSearchService> RecordingSearchService<S> {
    pub fn new(inner: S, store: Arc<GraphStore>) -> Self {
        Self { inner, store }
    }
}

#[async_trait]
impl<S: JobSearchService> JobSearchService for RecordingSearchService<S> {
    async fn search(&self, query: &str, filters: &JobSearchFilters) -> AppResult<SearchOutcome> {
        let outcome = self.inner.search(query, filters).await?;
        self.store.record_jobs(&outcome.jobs);
        Ok(outcome)
    }
}
