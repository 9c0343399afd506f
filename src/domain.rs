//! Domain types shared across tools, providers, and the agent
//!
//! These are the vocabulary of the system: job postings, search filters,
//! extracted keywords, and spreadsheet rows. Wire schemas for individual
//! tools live next to the tools themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting as surfaced by the search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    /// Stable identifier from the upstream board
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Truncated posting body, enough for analysis prompts
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
}

/// Optional narrowing criteria for a job search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

/// A single keyword extracted from a posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Keywords persisted for one job posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub job_id: String,
    pub keywords: Vec<KeywordEntry>,
    /// Where the keywords came from, e.g. the model or a manual pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One exported row in the tracking spreadsheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetRow {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub url: String,
    /// Application status column, free-form
    #[serde(default)]
    pub status: String,
    /// Row highlight color name understood by the sheet template
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}
