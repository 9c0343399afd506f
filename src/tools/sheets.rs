//! `sheets_export` tool: write job selections to a tracking spreadsheet

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::SheetRow;
use crate::error::{AppError, AppResult};
use crate::server::{Tool, ToolOutput};

/// Where exported rows land
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportDestination {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub tab: Option<String>,
    /// Optional A1 range override
    #[serde(default)]
    pub range: Option<String>,
}

/// How rows are written to the destination tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportMode {
    pub upsert: bool,
    pub clear_tab: bool,
}

/// Writes rows to the spreadsheet backend
#[async_trait]
pub trait SheetsExporter: Send + Sync {
    /// Export rows, returning how many were written
    async fn export(
        &self,
        rows: &[SheetRow],
        dest: &ExportDestination,
        mode: ExportMode,
    ) -> AppResult<usize>;
}

#[async_trait]
impl<E: SheetsExporter + ?Sized> SheetsExporter for std::sync::Arc<E> {
    async fn export(
        &self,
        rows: &[SheetRow],
        dest: &ExportDestination,
        mode: ExportMode,
    ) -> AppResult<usize> {
        (**self).export(rows, dest, mode).await
    }
}

/// Hydrates stored jobs into spreadsheet rows
#[async_trait]
pub trait JobDirectory: Send + Sync {
    async fn rows_for(
        &self,
        job_ids: &[String],
        filter: &HashMap<String, String>,
    ) -> AppResult<Vec<SheetRow>>;
}

#[async_trait]
impl<D: JobDirectory + ?Sized> JobDirectory for std::sync::Arc<D> {
    async fn rows_for(
        &self,
        job_ids: &[String],
        filter: &HashMap<String, String>,
    ) -> AppResult<Vec<SheetRow>> {
        (**self).rows_for(job_ids, filter).await
    }
}

#[derive(Debug, Deserialize)]
struct SheetsExportParams {
    #[serde(default)]
    job_ids: Vec<String>,
    #[serde(default)]
    rows: Vec<SheetRow>,
    #[serde(default)]
    filter: HashMap<String, String>,
    #[serde(default)]
    upsert: bool,
    #[serde(default)]
    clear_tab: bool,
    sheet: ExportDestination,
    #[serde(default)]
    #[allow(dead_code)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SheetsExportResult {
    spreadsheet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tab: Option<String>,
    written_rows: usize,
    mode: String,
    completed_at: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
}

/// The `sheets_export` tool
pub struct SheetsExportTool<E, D> {
    exporter: E,
    directory: D,
}

impl<E: SheetsExporter, D: JobDirectory> SheetsExportTool<E, D> {
    pub fn new(exporter: E, directory: D) -> Self {
        Self {
            exporter,
            directory,
        }
    }
}

#[async_trait]
impl<E: SheetsExporter, D: JobDirectory> Tool for SheetsExportTool<E, D> {
    fn name(&self) -> &str {
        super::SHEETS_EXPORT
    }

    fn description(&self) -> &str {
        "Export job selections to Google Sheets"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "job_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Jobs to rehydrate from storage"
                },
                "rows": {
                    "type": "array",
                    "description": "Explicit rows to write when not rehydrating"
                },
                "filter": {
                    "type": "object",
                    "description": "Optional filter tags applied server-side"
                },
                "upsert": { "type": "boolean" },
                "clear_tab": { "type": "boolean" },
                "sheet": {
                    "type": "object",
                    "properties": {
                        "spreadsheet_id": { "type": "string" },
                        "tab": { "type": "string" },
                        "range": { "type": "string" }
                    },
                    "required": ["spreadsheet_id"]
                },
                "metadata": { "type": "object" }
            },
            "required": ["sheet"]
        })
    }

    fn result_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "spreadsheet_id": { "type": "string" },
                "tab": { "type": "string" },
                "written_rows": { "type": "integer" },
                "mode": { "type": "string" }
            }
        })
    }

    async fn execute(&self, params: Value) -> AppResult<ToolOutput> {
        let params: SheetsExportParams = super::decode_params(params)?;
        if params.sheet.spreadsheet_id.is_empty() {
            return Err(AppError::invalid_params("sheets_export: spreadsheet_id is required"));
        }

        info!(
            spreadsheet_id = %params.sheet.spreadsheet_id,
            job_ids = params.job_ids.len(),
            rows = params.rows.len(),
            upsert = params.upsert,
            "sheets_export start"
        );

        let (rows, mode_name) = if !params.job_ids.is_empty() {
            let rows = self
                .directory
                .rows_for(&params.job_ids, &params.filter)
                .await?;
            (rows, "hydrate_jobs")
        } else if !params.rows.is_empty() {
            (params.rows, "append_rows")
        } else {
            return Err(AppError::tool(
                "sheets_export: either job_ids or rows must be provided",
            ));
        };

        if rows.is_empty() {
            warn!(mode = mode_name, "sheets_export produced no rows");
            let result = SheetsExportResult {
                spreadsheet_id: params.sheet.spreadsheet_id,
                tab: params.sheet.tab,
                written_rows: 0,
                mode: "noop".into(),
                completed_at: Utc::now(),
                message: "no rows to export".into(),
            };
            return Ok(ToolOutput::new(
                "[sheets_export] No rows to export",
                serde_json::to_value(&result)?,
            ));
        }

        let mode = ExportMode {
            upsert: params.upsert,
            clear_tab: params.clear_tab,
        };
        let written = self.exporter.export(&rows, &params.sheet, mode).await?;

        let result = SheetsExportResult {
            spreadsheet_id: params.sheet.spreadsheet_id.clone(),
            tab: params.sheet.tab.clone(),
            written_rows: written,
            mode: mode_name.into(),
            completed_at: Utc::now(),
            message: String::new(),
        };
        info!(
            written_rows = written,
            mode = mode_name,
            "sheets_export complete"
        );

        let text = format!(
            "[sheets_export] Exported {} row(s) to spreadsheet \"{}\" (tab: \"{}\", mode: {})",
            written,
            result.spreadsheet_id,
            result.tab.as_deref().unwrap_or_default(),
            result.mode
        );
        Ok(ToolOutput::new(text, serde_json::to_value(&result)?))
    }
}
