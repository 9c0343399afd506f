//! Tool registry and dispatch
//!
//! The [`Router`] owns every registered tool and executes calls with a
//! per-call timeout and panic containment. Registration is explicit:
//! binaries build a router and register tools at startup, and duplicate
//! names fail registration instead of silently replacing a handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{CallToolResult, ToolContent, ToolInfo};

/// Aborts the wrapped tool task when dropped
///
/// [`Router::call`] runs handlers in spawned tasks; callers that stop
/// polling the call (timeout, connection teardown) drop this guard and
/// the task is cancelled instead of running detached.
struct AbortOnDrop(JoinHandle<AppResult<ToolOutput>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Output of a tool execution before protocol rendering
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Human-readable summary shown to the model
    pub text: Option<String>,
    /// Structured payload for programmatic consumers
    pub data: Value,
}

impl ToolOutput {
    /// Output with both a text summary and structured data
    pub fn new(text: impl Into<String>, data: Value) -> Self {
        Self {
            text: Some(text.into()),
            data,
        }
    }

    /// Text-only output
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            data: Value::Null,
        }
    }

    /// Render into the `call_tool` result shape
    pub fn into_result(self) -> CallToolResult {
        let content = match self.text {
            Some(text) => vec![ToolContent::text(text)],
            None => Vec::new(),
        };
        CallToolResult {
            content,
            data: self.data,
        }
    }
}

/// A named, schema-described operation callable over the wire
///
/// Implementations decode their own parameters from the raw JSON value and
/// return [`AppError::InvalidParams`] on decode failure so the transport can
/// map it onto the right protocol error code.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// One-paragraph description surfaced to the model
    fn description(&self) -> &str;

    /// JSON schema of the accepted parameters
    fn input_schema(&self) -> Value;

    /// JSON schema of the structured result payload
    fn result_schema(&self) -> Value {
        Value::Null
    }

    /// Execute the tool with raw parameters
    async fn execute(&self, params: Value) -> AppResult<ToolOutput>;
}

/// Registry of tools with timeout-bounded dispatch
#[derive(Default)]
pub struct Router {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, failing if the name is already taken
    ///
    /// Duplicate registration is a startup bug, so the existing tool is
    /// left intact and the caller gets an error to abort on.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> AppResult<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AppError::tool(format!(
                "tool '{}' is already registered",
                name
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Snapshot of every registered tool's descriptor
    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: Some(tool.input_schema()),
                result_schema: match tool.result_schema() {
                    Value::Null => None,
                    schema => Some(schema),
                },
            })
            .collect()
    }

    /// Execute a named tool under a timeout
    ///
    /// The handler runs in a spawned task so a panicking tool surfaces as
    /// an ordinary error instead of taking down the connection loop.
    pub async fn call(
        &self,
        name: &str,
        params: Value,
        timeout: Duration,
    ) -> AppResult<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::tool(format!("unknown tool '{}'", name)))?;

        let tool_name = name.to_string();
        let mut task = AbortOnDrop(tokio::spawn(async move { tool.execute(params).await }));

        match tokio::time::timeout(timeout, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                error!(tool = %tool_name, error = %join_err, "tool task failed");
                Err(AppError::tool(format!(
                    "tool '{}' panicked during execution",
                    tool_name
                )))
            }
            Err(_) => {
                warn!(tool = %tool_name, timeout_secs = timeout.as_secs(), "tool call timed out");
                Err(AppError::tool(format!(
                    "tool '{}' timed out after {}s",
                    tool_name,
                    timeout.as_secs()
                )))
            }
        }
    }
}
