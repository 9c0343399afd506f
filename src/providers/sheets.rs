//! Google Sheets values-API client
//!
//! Writes rows through the spreadsheet values endpoints using a bearer
//! token from configuration. When no token is configured the client still
//! constructs, but every export reports "not configured" so the tool
//! degrades gracefully instead of failing at startup.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::SheetsConfig;
use crate::domain::SheetRow;
use crate::error::{AppError, AppResult};
use crate::tools::{ExportDestination, ExportMode, SheetsExporter};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Sheets values-API client
pub struct SheetsApiClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl SheetsApiClient {
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: config.token.clone(),
        }
    }

    fn token(&self) -> AppResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| AppError::tool("sheets export not configured: missing API token"))
    }

    async fn clear(&self, spreadsheet_id: &str, range: &str) -> AppResult<()> {
        let token = self.token()?;
        let url = format!("{}/{}/values/{}:clear", API_BASE, spreadsheet_id, range);
        let response = self.http.post(&url).bearer_auth(token).send().await?;
        check_status(response).await?;
        debug!(%spreadsheet_id, %range, "cleared sheet range");
        Ok(())
    }

    async fn write(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &serde_json::Value,
        upsert: bool,
    ) -> AppResult<()> {
        let token = self.token()?;
        let body = serde_json::json!({ "values": values });
        let response = if upsert {
            let url = format!(
                "{}/{}/values/{}?valueInputOption=RAW",
                API_BASE, spreadsheet_id, range
            );
            self.http.put(&url).bearer_auth(token).json(&body).send().await?
        } else {
            let url = format!(
                "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
                API_BASE, spreadsheet_id, range
            );
            self.http.post(&url).bearer_auth(token).json(&body).send().await?
        };
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> AppResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::tool(format!(
        "sheets: API error ({}): {}",
        status,
        body.trim()
    )))
}

/// Resolve the A1 range for a destination
fn resolve_range(dest: &ExportDestination) -> String {
    if let Some(range) = dest.range.as_deref().filter(|r| !r.is_empty()) {
        return range.to_string();
    }
    match dest.tab.as_deref().filter(|t| !t.is_empty()) {
        Some(tab) => format!("{}!A1", tab),
        None => "A1".to_string(),
    }
}

fn row_values(rows: &[SheetRow]) -> serde_json::Value {
    let values: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.title.clone(),
                row.company.clone(),
                row.location.clone(),
                row.url.clone(),
                row.status.clone(),
                row.color.clone(),
                row.notes.clone(),
                row.updated_at.to_rfc3339(),
            ]
        })
        .collect();
    serde_json::json!(values)
}

#[async_trait]
impl SheetsExporter for SheetsApiClient {
    async fn export(
        &self,
        rows: &[SheetRow],
        dest: &ExportDestination,
        mode: ExportMode,
    ) -> AppResult<usize> {
        let range = resolve_range(dest);
        if mode.clear_tab {
            self.clear(&dest.spreadsheet_id, &range).await?;
        }
        self.write(
            &dest.spreadsheet_id,
            &range,
            &row_values(rows),
            mode.upsert,
        )
        .await?;
        info!(
            spreadsheet_id = %dest.spreadsheet_id,
            rows = rows.len(),
            upsert = mode.upsert,
            "rows written to sheet"
        );
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_range_resolution() {
        let mut dest = ExportDestination {
            spreadsheet_id: "doc".into(),
            tab: None,
            range: None,
        };
        assert_eq!(resolve_range(&dest), "A1");
        dest.tab = Some("Jobs".into());
        assert_eq!(resolve_range(&dest), "Jobs!A1");
        dest.range = Some("Jobs!B2:H10".into());
        assert_eq!(resolve_range(&dest), "Jobs!B2:H10");
    }

    #[test]
    fn test_row_values_shape() {
        let rows = vec![SheetRow {
            title: "Rust Engineer".into(),
            company: "Acme".into(),
            location: "Berlin".into(),
            url: "https://jobs.example/1".into(),
            status: "applied".into(),
            color: String::new(),
            notes: "rust, tokio".into(),
            updated_at: Utc::now(),
        }];
        let values = row_values(&rows);
        assert_eq!(values[0][0], "Rust Engineer");
        assert_eq!(values[0][6], "rust, tokio");
        assert_eq!(values.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_degrades() {
        let client = SheetsApiClient::new(&SheetsConfig::default());
        let dest = ExportDestination {
            spreadsheet_id: "doc".into(),
            tab: None,
            range: None,
        };
        let err = client
            .export(&[], &dest, ExportMode { upsert: false, clear_tab: false })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
