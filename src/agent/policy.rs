//! Workflow policy for the orchestration loop
//!
//! After a successful job search the agent must persist extracted keywords
//! before it is allowed to export anything to the spreadsheet. The gate is
//! an explicit state machine so the blocked window is visible in the type
//! rather than buried in a boolean.

use serde_json::{json, Value};

use crate::tools;

/// Export gate states across one query
///
/// `job_search` success moves the gate to [`SearchPendingPersist`];
/// `persist_keywords` success moves it on to [`ReadyToExport`]. Export is
/// blocked only while a search result is pending persistence.
///
/// [`SearchPendingPersist`]: ExportGate::SearchPendingPersist
/// [`ReadyToExport`]: ExportGate::ReadyToExport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportGate {
    /// No search has happened yet; export of previously stored data is fine
    #[default]
    NoSearchYet,
    /// Fresh search results exist whose keywords are not persisted yet
    SearchPendingPersist,
    /// Keywords were persisted; export may proceed
    ReadyToExport,
}

/// A blocked tool call and the recovery the model is told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub message: String,
    pub required_action: String,
}

impl PolicyViolation {
    /// Render as the synthetic tool response fed back to the model
    pub fn to_response(&self) -> Value {
        json!({
            "error": self.message,
            "required_action": self.required_action,
        })
    }
}

impl ExportGate {
    /// Check whether a tool call is allowed in the current state
    pub fn check(&self, tool_name: &str) -> Result<(), PolicyViolation> {
        if tool_name == tools::SHEETS_EXPORT && *self == ExportGate::SearchPendingPersist {
            return Err(PolicyViolation {
                message: "Workflow violation: You must call persist_keywords to extract and \
                          store keywords from the job search results BEFORE calling sheets_export."
                    .to_string(),
                required_action: "Call persist_keywords with all job IDs and their extracted keywords"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Advance the gate after a successful tool call
    pub fn observe_success(&mut self, tool_name: &str) {
        match tool_name {
            tools::JOB_SEARCH => *self = ExportGate::SearchPendingPersist,
            tools::PERSIST_KEYWORDS => *self = ExportGate::ReadyToExport,
            _ => {}
        }
    }
}
