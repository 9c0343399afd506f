//! Agent-side orchestration
//!
//! The [`Orchestrator`] drives one user query through a bounded
//! conversation loop: ask the model, run the tools it requests under the
//! workflow policy, feed every result back in one batch, and stop on the
//! first text-only turn.

pub mod model;
pub mod policy;
pub mod rpc;

pub use model::{ChatModel, GeminiModel, ModelInput, ModelTurn, ToolRequest};
pub use policy::{ExportGate, PolicyViolation};
pub use rpc::{RpcClient, ToolCallError, ToolClient};

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{CallToolResult, ToolContent};

/// Ceiling for one tool round trip
const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default iteration budget per query
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Bounded, workflow-enforcing conversation loop
pub struct Orchestrator<M, C> {
    model: M,
    tools: C,
    max_iterations: usize,
}

impl<M: ChatModel, C: ToolClient> Orchestrator<M, C> {
    pub fn new(model: M, tools: C) -> Self {
        Self {
            model,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Override the iteration budget
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run one user query to completion
    ///
    /// Workflow state lives for exactly one query: the gate is fresh on
    /// entry and dropped on return. Cancellation is observed between
    /// iterations and around every model and tool round trip.
    pub async fn run_query(
        &mut self,
        query: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> AppResult<String> {
        let mut gate = ExportGate::default();
        let mut last_tool_called: Option<String> = None;
        let mut parts = vec![ModelInput::UserText(query.to_string())];

        for iteration in 1..=self.max_iterations {
            if *cancel.borrow() {
                return Err(AppError::Cancelled);
            }
            info!(iteration, "agent iteration");

            let turn = tokio::select! {
                turn = self.model.send_turn(parts.clone()) => turn?,
                _ = cancel.changed() => return Err(AppError::Cancelled),
            };

            if turn.tool_requests.is_empty() {
                if !turn.text.is_empty() {
                    return Ok(turn.text);
                }
                if turn.candidate_count > 0 {
                    // Model produced neither text nor calls; give it
                    // another turn with the same input.
                    continue;
                }
                return Err(AppError::model("model returned an empty response"));
            }

            let mut responses = Vec::with_capacity(turn.tool_requests.len());
            for request in &turn.tool_requests {
                let response = self
                    .execute_tool(request, &mut gate, &mut last_tool_called, cancel)
                    .await?;
                responses.push(ModelInput::ToolResponse {
                    name: request.name.clone(),
                    response,
                });
            }

            // Every result from this turn goes back to the model at once.
            parts = responses;
        }

        Err(AppError::agent("max iterations reached"))
    }

    /// Run one requested tool under the policy and return its feedback value
    async fn execute_tool(
        &mut self,
        request: &ToolRequest,
        gate: &mut ExportGate,
        last_tool_called: &mut Option<String>,
        cancel: &mut watch::Receiver<bool>,
    ) -> AppResult<Value> {
        if let Err(violation) = gate.check(&request.name) {
            warn!(tool = %request.name, "tool call blocked by workflow policy");
            return Ok(violation.to_response());
        }

        info!(tool = %request.name, "calling tool");
        let call = tokio::time::timeout(
            TOOL_CALL_TIMEOUT,
            self.tools.call_tool(&request.name, request.args.clone()),
        );
        let outcome = tokio::select! {
            outcome = call => outcome,
            _ = cancel.changed() => return Err(AppError::Cancelled),
        };

        match outcome {
            Ok(Ok(result)) => {
                gate.observe_success(&request.name);
                *last_tool_called = Some(request.name.clone());
                Ok(render_result(&result))
            }
            Ok(Err(ToolCallError::Tool(message))) => {
                warn!(tool = %request.name, %message, "tool returned an error");
                *last_tool_called = Some(request.name.clone());
                Ok(json!({ "error": message }))
            }
            Ok(Err(ToolCallError::Transport(err))) => Err(err),
            Err(_) => {
                warn!(tool = %request.name, "tool call timed out");
                *last_tool_called = Some(request.name.clone());
                Ok(json!({
                    "error": format!(
                        "tool '{}' timed out after {}s",
                        request.name,
                        TOOL_CALL_TIMEOUT.as_secs()
                    )
                }))
            }
        }
    }
}

/// Flatten a tool result into the response value fed to the model
fn render_result(result: &CallToolResult) -> Value {
    let texts: Vec<&str> = result
        .content
        .iter()
        .map(|content| match content {
            ToolContent::Text { text } => text.as_str(),
        })
        .collect();
    if texts.is_empty() {
        json!({ "result": "Tool executed successfully" })
    } else {
        json!({ "result": texts.join("\n") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_result_joins_text_blocks() {
        let result = CallToolResult {
            content: vec![
                ToolContent::text("first"),
                ToolContent::text("second"),
            ],
            data: Value::Null,
        };
        assert_eq!(render_result(&result)["result"], "first\nsecond");
    }

    #[test]
    fn test_render_result_empty_content() {
        let result = CallToolResult {
            content: Vec::new(),
            data: Value::Null,
        };
        assert_eq!(render_result(&result)["result"], "Tool executed successfully");
    }
}
