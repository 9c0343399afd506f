//! Orchestrator loop tests with a scripted model and a spy tool client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use ets::agent::{
    ChatModel, ModelInput, ModelTurn, Orchestrator, ToolCallError, ToolClient, ToolRequest,
};
use ets::protocol::{CallToolResult, ToolContent};
use ets::{AppError, AppResult};

/// Model that replays scripted turns and records every input it receives
struct ScriptModel {
    turns: VecDeque<ModelTurn>,
    inputs: Arc<Mutex<Vec<Vec<ModelInput>>>>,
}

impl ScriptModel {
    fn new(turns: Vec<ModelTurn>) -> (Self, Arc<Mutex<Vec<Vec<ModelInput>>>>) {
        let inputs = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                turns: turns.into(),
                inputs: inputs.clone(),
            },
            inputs,
        )
    }
}

#[async_trait]
impl ChatModel for ScriptModel {
    async fn send_turn(&mut self, parts: Vec<ModelInput>) -> AppResult<ModelTurn> {
        self.inputs.lock().unwrap().push(parts);
        self.turns
            .pop_front()
            .ok_or_else(|| AppError::model("script exhausted"))
    }
}

/// Tool client that records calls and answers from a script
#[derive(Clone, Default)]
struct SpyClient {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl SpyClient {
    fn fail_tool(&self, name: &str) {
        self.failures.lock().unwrap().push(name.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolClient for SpyClient {
    async fn call_tool(
        &mut self,
        name: &str,
        _args: Value,
    ) -> Result<CallToolResult, ToolCallError> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.failures.lock().unwrap().iter().any(|f| f == name) {
            return Err(ToolCallError::Tool(format!("{} exploded", name)));
        }
        Ok(CallToolResult {
            content: vec![ToolContent::text(format!("{} ok", name))],
            data: Value::Null,
        })
    }
}

fn tool_turn(requests: &[&str]) -> ModelTurn {
    ModelTurn {
        text: String::new(),
        tool_requests: requests
            .iter()
            .map(|name| ToolRequest {
                name: name.to_string(),
                args: json!({}),
            })
            .collect(),
        candidate_count: 1,
    }
}

fn text_turn(text: &str) -> ModelTurn {
    ModelTurn {
        text: text.to_string(),
        tool_requests: Vec::new(),
        candidate_count: 1,
    }
}

fn cancel_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    // Keep the sender alive for the test duration.
    std::mem::forget(tx);
    rx
}

#[tokio::test]
async fn export_is_blocked_until_keywords_are_persisted() {
    let (model, inputs) = ScriptModel::new(vec![
        tool_turn(&["job_search", "sheets_export"]),
        tool_turn(&["persist_keywords"]),
        tool_turn(&["sheets_export"]),
        text_turn("done"),
    ]);
    let spy = SpyClient::default();
    let mut orchestrator = Orchestrator::new(model, spy.clone());

    let answer = orchestrator
        .run_query("find rust jobs", &mut cancel_channel())
        .await
        .unwrap();
    assert_eq!(answer, "done");

    // The blocked export never reached the tool client.
    assert_eq!(
        spy.calls(),
        vec!["job_search", "persist_keywords", "sheets_export"]
    );

    // The synthesized violation response went back to the model.
    let inputs = inputs.lock().unwrap();
    let second_input = &inputs[1];
    let export_response = second_input
        .iter()
        .find_map(|part| match part {
            ModelInput::ToolResponse { name, response } if name == "sheets_export" => {
                Some(response.clone())
            }
            _ => None,
        })
        .expect("export response missing");
    assert!(export_response["error"]
        .as_str()
        .unwrap()
        .contains("persist_keywords"));
    assert!(export_response.get("required_action").is_some());
}

#[tokio::test]
async fn export_without_prior_search_is_allowed() {
    let (model, _inputs) = ScriptModel::new(vec![
        tool_turn(&["sheets_export"]),
        text_turn("exported"),
    ]);
    let spy = SpyClient::default();
    let mut orchestrator = Orchestrator::new(model, spy.clone());

    let answer = orchestrator
        .run_query("export my saved jobs", &mut cancel_channel())
        .await
        .unwrap();
    assert_eq!(answer, "exported");
    assert_eq!(spy.calls(), vec!["sheets_export"]);
}

#[tokio::test]
async fn budget_terminates_after_exactly_max_iterations() {
    let (model, inputs) = ScriptModel::new(vec![
        tool_turn(&["graph_tool"]),
        tool_turn(&["graph_tool"]),
        tool_turn(&["graph_tool"]),
        tool_turn(&["graph_tool"]),
    ]);
    let spy = SpyClient::default();
    let mut orchestrator = Orchestrator::new(model, spy.clone()).with_max_iterations(3);

    let err = orchestrator
        .run_query("loop forever", &mut cancel_channel())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("max iterations reached"));
    assert_eq!(inputs.lock().unwrap().len(), 3);
    assert_eq!(spy.calls().len(), 3);
}

#[tokio::test]
async fn all_tool_results_feed_back_in_one_batch() {
    let (model, inputs) = ScriptModel::new(vec![
        tool_turn(&["job_search", "job_analysis", "graph_tool"]),
        text_turn("summary"),
    ]);
    let spy = SpyClient::default();
    let mut orchestrator = Orchestrator::new(model, spy);

    orchestrator
        .run_query("busy turn", &mut cancel_channel())
        .await
        .unwrap();

    let inputs = inputs.lock().unwrap();
    assert_eq!(inputs.len(), 2);
    let feedback = &inputs[1];
    assert_eq!(feedback.len(), 3);
    assert!(feedback
        .iter()
        .all(|part| matches!(part, ModelInput::ToolResponse { .. })));
}

#[tokio::test]
async fn tool_failure_becomes_feedback_not_abort() {
    let (model, inputs) = ScriptModel::new(vec![
        tool_turn(&["job_search"]),
        text_turn("recovered"),
    ]);
    let spy = SpyClient::default();
    spy.fail_tool("job_search");
    let mut orchestrator = Orchestrator::new(model, spy);

    let answer = orchestrator
        .run_query("find jobs", &mut cancel_channel())
        .await
        .unwrap();
    assert_eq!(answer, "recovered");

    let inputs = inputs.lock().unwrap();
    match &inputs[1][0] {
        ModelInput::ToolResponse { response, .. } => {
            assert!(response["error"].as_str().unwrap().contains("exploded"));
        }
        other => panic!("expected tool response, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_search_does_not_arm_the_export_gate() {
    let (model, _inputs) = ScriptModel::new(vec![
        tool_turn(&["job_search"]),
        tool_turn(&["sheets_export"]),
        text_turn("done"),
    ]);
    let spy = SpyClient::default();
    spy.fail_tool("job_search");
    let mut orchestrator = Orchestrator::new(model, spy.clone());

    orchestrator
        .run_query("find jobs then export", &mut cancel_channel())
        .await
        .unwrap();

    // The failed search never transitioned the gate, so export went through.
    assert_eq!(spy.calls(), vec!["job_search", "sheets_export"]);
}

#[tokio::test]
async fn empty_turn_with_candidates_loops_again() {
    let (model, inputs) = ScriptModel::new(vec![
        ModelTurn {
            text: String::new(),
            tool_requests: Vec::new(),
            candidate_count: 1,
        },
        text_turn("eventually"),
    ]);
    let spy = SpyClient::default();
    let mut orchestrator = Orchestrator::new(model, spy);

    let answer = orchestrator
        .run_query("hello", &mut cancel_channel())
        .await
        .unwrap();
    assert_eq!(answer, "eventually");

    // Both turns saw the original user text.
    let inputs = inputs.lock().unwrap();
    assert_eq!(inputs.len(), 2);
    assert!(matches!(&inputs[1][0], ModelInput::UserText(text) if text == "hello"));
}

#[tokio::test]
async fn empty_turn_without_candidates_is_an_error() {
    let (model, _inputs) = ScriptModel::new(vec![ModelTurn::default()]);
    let mut orchestrator = Orchestrator::new(model, SpyClient::default());

    let err = orchestrator
        .run_query("hello", &mut cancel_channel())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empty response"));
}

#[tokio::test]
async fn cancellation_preempts_the_loop() {
    let (model, _inputs) = ScriptModel::new(vec![text_turn("never seen")]);
    let mut orchestrator = Orchestrator::new(model, SpyClient::default());

    let (tx, mut rx) = watch::channel(true);
    let err = orchestrator.run_query("anything", &mut rx).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled));
    drop(tx);
}

#[tokio::test]
async fn workflow_state_resets_between_queries() {
    let (model, _inputs) = ScriptModel::new(vec![
        tool_turn(&["job_search"]),
        text_turn("first done"),
        tool_turn(&["sheets_export"]),
        text_turn("second done"),
    ]);
    let spy = SpyClient::default();
    let mut orchestrator = Orchestrator::new(model, spy.clone());

    orchestrator
        .run_query("search", &mut cancel_channel())
        .await
        .unwrap();
    // A fresh query starts with a fresh gate: the pending search from the
    // previous query no longer blocks export.
    orchestrator
        .run_query("export", &mut cancel_channel())
        .await
        .unwrap();

    assert_eq!(spy.calls(), vec!["job_search", "sheets_export"]);
}
