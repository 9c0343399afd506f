//! Language model client for the agent
//!
//! Defines the function-calling contract the orchestrator depends on and a
//! Gemini implementation over the `generateContent` REST API. The model is
//! opaque: the orchestrator only sees text, tool requests, and the
//! candidate count of each turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::protocol::ToolInfo;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYSTEM_PROMPT: &str = r#"You are a professional job search assistant helping users manage their job search efficiently.

YOUR ROLE:
- Help users search for jobs, analyze opportunities, and export data to spreadsheets
- Understand natural language requests and select the appropriate tools
- Be proactive but ask clarifying questions when needed

AVAILABLE TOOLS:
- job_search: Find job postings based on search criteria
- persist_keywords: Extract and store ATS keywords from job descriptions
- job_analysis: Analyze job requirements and match with user profile
- graph_tool: Query the job database for statistics and insights
- sheets_export: Export job data to Google Sheets

TOOL USAGE GUIDELINES:

For job searches ("find jobs", "search for", "show me jobs"):
1. Call job_search to retrieve job postings
2. AUTOMATICALLY extract 5-10 relevant ATS keywords from each job description
   - Focus on: technologies, programming languages, tools, frameworks, methodologies, certifications
   - Think like an ATS system: what would a recruiter search for?
3. Call persist_keywords with ALL extracted keywords at once
4. If sheets are configured, call sheets_export to save the results
5. Provide a summary to the user

For job analysis ("analyze job", "tell me about job", "evaluate position"):
- ONLY call job_analysis with the job ID
- Do NOT extract keywords or search for additional jobs
- Focus on providing insights about that specific job

For statistics ("how many jobs", "show me trends", "what's the count"):
- ONLY call graph_tool to query the database
- Do NOT search for jobs or extract keywords
- Provide clear statistical answers

For general questions about your role or capabilities:
- Answer directly without calling tools
- Be helpful and explain what you can do

IMPORTANT RULES:
1. Choose the right tool for the task - don't over-complicate simple requests
2. For job_search, keyword extraction is MANDATORY (automatic step 2)
3. For job_analysis or graph_tool, do NOT extract keywords
4. If a tool call fails, explain the error clearly and offer alternatives
5. Don't ask permission to extract keywords during job search - just do it
6. Never make up data - only use information from tool responses

ERROR HANDLING:
- If a tool fails, explain what went wrong in plain language
- Suggest what the user should do next
- Don't give up after one failure - try alternative approaches if reasonable

Remember: You are here to make the job search process smooth and efficient. Be proactive, accurate, and helpful."#;

/// One part of the next model input
#[derive(Debug, Clone)]
pub enum ModelInput {
    /// The user's query text
    UserText(String),
    /// A tool response fed back to the model
    ToolResponse { name: String, response: Value },
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub name: String,
    pub args: Value,
}

/// What the model produced in one turn
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    /// Concatenated text parts across candidates
    pub text: String,
    /// Tool invocations requested this turn
    pub tool_requests: Vec<ToolRequest>,
    /// How many candidates the model returned
    pub candidate_count: usize,
}

/// Stateful chat model behind a function-calling contract
#[async_trait]
pub trait ChatModel: Send {
    async fn send_turn(&mut self, parts: Vec<ModelInput>) -> AppResult<ModelTurn>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Gemini chat model over the `generateContent` REST API
pub struct GeminiModel {
    http: reqwest::Client,
    api_key: String,
    model: String,
    system_prompt: String,
    tools: Value,
    history: Vec<Content>,
}

impl GeminiModel {
    /// Build a model client advertising the given tools
    ///
    /// When a sheets document id is configured it is appended to the system
    /// prompt so the model never asks the user for it.
    pub fn new(api_key: String, model: String, tools: &[ToolInfo], sheets_id: Option<&str>) -> Self {
        let mut system_prompt = SYSTEM_PROMPT.to_string();
        if let Some(id) = sheets_id.filter(|id| !id.is_empty()) {
            system_prompt.push_str(&format!(
                "\n\nFor sheets_export, ALWAYS use this Google Sheets ID: {id}\n\
                 Format: {{\"job_ids\": [\"id1\", \"id2\"], \"sheet\": {{\"spreadsheet_id\": \"{id}\", \"tab\": \"Sheet1\"}}}}\n\
                 DO NOT ask the user for the spreadsheet ID."
            ));
        }
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            system_prompt,
            tools: build_function_declarations(tools),
            history: Vec::new(),
        }
    }
}

/// Convert tool descriptors into Gemini function declarations
fn build_function_declarations(tools: &[ToolInfo]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": convert_schema(tool.input_schema.as_ref()),
            })
        })
        .collect();
    json!([{ "functionDeclarations": declarations }])
}

/// Reduce a JSON schema to the subset Gemini accepts
///
/// Passes through type, description, properties, required, and items;
/// everything else (anyOf, formats) is dropped. Unknown or missing types
/// fall back to object.
fn convert_schema(schema: Option<&Value>) -> Value {
    let Some(Value::Object(schema)) = schema else {
        return json!({"type": "OBJECT"});
    };

    let type_name = match schema.get("type").and_then(Value::as_str) {
        Some("string") => "STRING",
        Some("number") | Some("integer") => "NUMBER",
        Some("boolean") => "BOOLEAN",
        Some("array") => "ARRAY",
        _ => "OBJECT",
    };

    let mut out = Map::new();
    out.insert("type".into(), json!(type_name));
    if let Some(description) = schema.get("description") {
        out.insert("description".into(), description.clone());
    }
    if let Some(required) = schema.get("required") {
        out.insert("required".into(), required.clone());
    }
    if let Some(Value::Object(properties)) = schema.get("properties") {
        let converted: Map<String, Value> = properties
            .iter()
            .map(|(name, prop)| (name.clone(), convert_schema(Some(prop))))
            .collect();
        out.insert("properties".into(), Value::Object(converted));
    }
    if let Some(items) = schema.get("items") {
        out.insert("items".into(), convert_schema(Some(items)));
    }
    Value::Object(out)
}

fn input_to_content(parts: Vec<ModelInput>) -> Content {
    let parts = parts
        .into_iter()
        .map(|input| match input {
            ModelInput::UserText(text) => Part {
                text: Some(text),
                ..Default::default()
            },
            ModelInput::ToolResponse { name, response } => Part {
                function_response: Some(FunctionResponse { name, response }),
                ..Default::default()
            },
        })
        .collect();
    Content {
        role: "user".to_string(),
        parts,
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn send_turn(&mut self, parts: Vec<ModelInput>) -> AppResult<ModelTurn> {
        self.history.push(input_to_content(parts));

        let body = json!({
            "systemInstruction": { "parts": [{ "text": self.system_prompt }] },
            "tools": self.tools,
            "contents": self.history,
        });
        let url = format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::model(format!(
                "generateContent failed ({}): {}",
                status,
                detail.trim()
            )));
        }
        let payload: GenerateResponse = response.json().await?;
        debug!(candidates = payload.candidates.len(), "model turn received");

        let mut turn = ModelTurn {
            candidate_count: payload.candidates.len(),
            ..Default::default()
        };
        for candidate in payload.candidates {
            let Some(content) = candidate.content else {
                continue;
            };
            for part in &content.parts {
                if let Some(text) = &part.text {
                    turn.text.push_str(text);
                }
                if let Some(call) = &part.function_call {
                    turn.tool_requests.push(ToolRequest {
                        name: call.name.clone(),
                        args: call.args.clone().unwrap_or_else(|| json!({})),
                    });
                }
            }
            self.history.push(content);
        }
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_conversion_maps_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "search text" },
                "remote": { "type": "boolean" },
                "skills": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["query"]
        });
        let converted = convert_schema(Some(&schema));
        assert_eq!(converted["type"], "OBJECT");
        assert_eq!(converted["properties"]["query"]["type"], "STRING");
        assert_eq!(converted["properties"]["remote"]["type"], "BOOLEAN");
        assert_eq!(converted["properties"]["skills"]["items"]["type"], "STRING");
        assert_eq!(converted["required"], json!(["query"]));
    }

    #[test]
    fn test_schema_conversion_defaults_to_object() {
        assert_eq!(convert_schema(None)["type"], "OBJECT");
        assert_eq!(convert_schema(Some(&json!("bogus")))["type"], "OBJECT");
    }

    #[test]
    fn test_sheets_id_lands_in_prompt() {
        let model = GeminiModel::new("key".into(), "gemini-2.5-flash".into(), &[], Some("doc-1"));
        assert!(model.system_prompt.contains("doc-1"));

        let model = GeminiModel::new("key".into(), "gemini-2.5-flash".into(), &[], None);
        assert!(!model.system_prompt.contains("spreadsheet_id"));
    }

    #[test]
    fn test_tool_response_serialization() {
        let content = input_to_content(vec![ModelInput::ToolResponse {
            name: "job_search".into(),
            response: json!({"result": "ok"}),
        }]);
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["parts"][0]["functionResponse"]["name"], "job_search");
    }
}
