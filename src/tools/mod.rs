//! Tool implementations exposed through the registry
//!
//! Each tool lives in its own module together with the narrow collaborator
//! trait it depends on. Tools decode their own parameters from raw JSON and
//! return [`ToolOutput`] with a human-readable summary plus structured data.

pub mod analysis;
pub mod graph;
pub mod job_search;
pub mod keywords;
pub mod sheets;

pub use analysis::{AnalysisService, JobAnalysisTool};
pub use graph::{GraphInspector, GraphRequest, GraphTool};
pub use job_search::{JobSearchService, JobSearchTool, SearchOutcome};
pub use keywords::{KeywordStore, PersistKeywordsTool};
pub use sheets::{ExportDestination, ExportMode, JobDirectory, SheetsExportTool, SheetsExporter};

/// Canonical tool names, shared by registration and the agent policy
pub const JOB_SEARCH: &str = "job_search";
pub const PERSIST_KEYWORDS: &str = "persist_keywords";
pub const JOB_ANALYSIS: &str = "job_analysis";
pub const GRAPH_TOOL: &str = "graph_tool";
pub const SHEETS_EXPORT: &str = "sheets_export";

/// Decode tool params into a typed struct, mapping failure to invalid params
pub(crate) fn decode_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Value,
) -> crate::AppResult<T> {
    let value = match params {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(value).map_err(|err| crate::AppError::invalid_params(err.to_string()))
}
