//! `graph_tool`: developer tool for inspecting the knowledge graph

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::server::{Tool, ToolOutput};

/// What the inspector is being asked to do
///
/// Built from the tool parameters: an explicit query takes precedence, a
/// bare job id asks for that job's stored context, and nothing at all
/// falls back to a label overview of the whole graph.
#[derive(Debug, Clone)]
pub enum GraphRequest {
    /// Run a caller-supplied query with bound parameters
    Query {
        query: String,
        params: HashMap<String, Value>,
    },
    /// Fetch the stored context around one job
    JobContext { job_id: String },
    /// Summarize node labels and counts
    LabelOverview,
}

/// Executes graph inspections and formats the rows for display
#[async_trait]
pub trait GraphInspector: Send + Sync {
    async fn inspect(&self, request: &GraphRequest) -> AppResult<String>;
}

#[async_trait]
impl<I: GraphInspector + ?Sized> GraphInspector for std::sync::Arc<I> {
    async fn inspect(&self, request: &GraphRequest) -> AppResult<String> {
        (**self).inspect(request).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct GraphToolParams {
    #[serde(default)]
    cypher: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    filters: Option<HashMap<String, Value>>,
}

/// The `graph_tool` tool
pub struct GraphTool<I> {
    inspector: Option<I>,
}

impl<I: GraphInspector> GraphTool<I> {
    /// Build the tool; `None` means no graph backend is configured and
    /// every call degrades to a tool error.
    pub fn new(inspector: Option<I>) -> Self {
        Self { inspector }
    }
}

#[async_trait]
impl<I: GraphInspector> Tool for GraphTool<I> {
    fn name(&self) -> &str {
        super::GRAPH_TOOL
    }

    fn description(&self) -> &str {
        "Developer tool for inspecting and debugging the knowledge graph"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cypher": { "type": "string", "description": "Custom graph query to run" },
                "job_id": { "type": "string" },
                "user_id": { "type": "string" },
                "filters": {
                    "type": "object",
                    "description": "Optional label/relation filters"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> AppResult<ToolOutput> {
        let inspector = self
            .inspector
            .as_ref()
            .ok_or_else(|| AppError::tool("graph_tool unavailable: graph backend not configured"))?;

        let params: GraphToolParams = super::decode_params(params)?;
        let request = build_request(params);
        debug!(?request, "graph_tool request");

        let formatted = inspector.inspect(&request).await?;
        Ok(ToolOutput::text(formatted))
    }
}

fn build_request(params: GraphToolParams) -> GraphRequest {
    if let Some(query) = params.cypher.filter(|q| !q.trim().is_empty()) {
        let mut bound = HashMap::new();
        if let Some(job_id) = params.job_id {
            bound.insert("jobId".to_string(), Value::String(job_id));
        }
        if let Some(user_id) = params.user_id {
            bound.insert("userId".to_string(), Value::String(user_id));
        }
        if let Some(filters) = params.filters {
            bound.extend(filters);
        }
        return GraphRequest::Query {
            query,
            params: bound,
        };
    }
    if let Some(job_id) = params.job_id.filter(|id| !id.is_empty()) {
        return GraphRequest::JobContext { job_id };
    }
    GraphRequest::LabelOverview
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoInspector;

    #[async_trait]
    impl GraphInspector for EchoInspector {
        async fn inspect(&self, request: &GraphRequest) -> AppResult<String> {
            Ok(format!("{:?}", request))
        }
    }

    #[tokio::test]
    async fn test_unconfigured_inspector_is_tool_error() {
        let tool: GraphTool<EchoInspector> = GraphTool::new(None);
        let err = tool.execute(Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn test_defaults_to_label_overview() {
        let tool = GraphTool::new(Some(EchoInspector));
        let out = tool.execute(json!({})).await.unwrap();
        assert!(out.text.unwrap().contains("LabelOverview"));
    }

    #[test]
    fn test_cypher_takes_precedence_over_job_id() {
        let request = build_request(GraphToolParams {
            cypher: Some("MATCH (n) RETURN n".into()),
            job_id: Some("j-1".into()),
            user_id: None,
            filters: None,
        });
        match request {
            GraphRequest::Query { params, .. } => {
                assert_eq!(params.get("jobId"), Some(&Value::String("j-1".into())));
            }
            other => panic!("expected custom query, got {:?}", other),
        }
    }

    #[test]
    fn test_job_id_builds_context_request() {
        let request = build_request(GraphToolParams {
            job_id: Some("j-9".into()),
            ..Default::default()
        });
        assert!(matches!(request, GraphRequest::JobContext { job_id } if job_id == "j-9"));
    }
}
