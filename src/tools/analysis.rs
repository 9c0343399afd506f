//! `job_analysis` tool: summarize stored jobs against a candidate profile

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::domain::KeywordEntry;
use crate::error::AppResult;
use crate::server::{Tool, ToolOutput};

/// Inputs to one analysis run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub job_ids: Vec<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
}

/// Per-job context assembled for the model
#[derive(Debug, Clone, Serialize)]
pub struct JobInsight {
    pub job_id: String,
    /// Job title and company in one line
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<KeywordEntry>,
    /// Full stored context for downstream reasoning
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// Structured result of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub jobs: Vec<JobInsight>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Hydrates graph context for stored jobs
///
/// Unknown job ids yield an empty result set rather than an error so the
/// agent can recover by searching again.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisReport>;
}

#[async_trait]
impl<S: AnalysisService + ?Sized> AnalysisService for std::sync::Arc<S> {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisReport> {
        (**self).analyze(request).await
    }
}

/// The `job_analysis` tool
pub struct JobAnalysisTool<S> {
    service: S,
}

impl<S: AnalysisService> JobAnalysisTool<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: AnalysisService> Tool for JobAnalysisTool<S> {
    fn name(&self) -> &str {
        super::JOB_ANALYSIS
    }

    fn description(&self) -> &str {
        "Summarize stored job graphs against a candidate profile"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "job_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Stored job identifiers to analyze"
                },
                "profile": {
                    "type": "string",
                    "description": "Free-form resume/profile to compare against"
                },
                "focus": {
                    "type": "string",
                    "description": "Optional prompt such as 'compare to my resume'"
                }
            }
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
                            "job_id": { "type": "string" },
                            "summary": { "type": "string" },
                            "keywords": { "type": "array" }
                        }
                    }
                },
                "generated_at": { "type": "string", "format": "date-time" },
                "notes": { "type": "string" }
            }
        })
    }

    async fn execute(&self, params: Value) -> AppResult<ToolOutput> {
        let request: AnalysisRequest = super::decode_params(params)?;
        info!(
            job_ids = request.job_ids.len(),
            has_profile = request.profile.is_some(),
            "job_analysis request"
        );

        let report = self.service.analyze(&request).await?;

        let text = if report.jobs.is_empty() {
            "[job_analysis] No jobs found for provided IDs".to_string()
        } else {
            let mut text = format!(
                "[job_analysis] Retrieved {} job(s) with graph context\n",
                report.jobs.len()
            );
            for job in &report.jobs {
                text.push_str(&format!(
                    "\n- {} (keywords: {})",
                    job.summary,
                    job.keywords.len()
                ));
            }
            text
        };

        Ok(ToolOutput::new(text, serde_json::to_value(&report)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyService;

    #[async_trait]
    impl AnalysisService for EmptyService {
        async fn analyze(&self, _request: &AnalysisRequest) -> AppResult<AnalysisReport> {
            Ok(AnalysisReport {
                jobs: Vec::new(),
                generated_at: Utc::now(),
                notes: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_unknown_ids_produce_empty_report() {
        let tool = JobAnalysisTool::new(EmptyService);
        let out = tool
            .execute(json!({"job_ids": ["missing-1", "missing-2"]}))
            .await
            .unwrap();
        assert!(out.text.unwrap().contains("No jobs found"));
        assert_eq!(out.data["jobs"], json!([]));
    }

    #[tokio::test]
    async fn test_accepts_empty_params() {
        let tool = JobAnalysisTool::new(EmptyService);
        assert!(tool.execute(Value::Null).await.is_ok());
    }
}
