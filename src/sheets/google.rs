//! Google Sheets API v4 store

use super::auth::{fetch_access_token, ServiceAccountKey, SCOPES};
use super::TabularStore;
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use async_trait::async_trait;
use geo_sync_common::{CellRef, RangeRef};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

pub struct GoogleSheetsStore {
    client: reqwest::Client,
    token: String,
    spreadsheet_id: String,
    worksheet: String,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Drive IDs are long and contain no spaces; names rarely are both
pub fn looks_like_spreadsheet_id(text: &str) -> bool {
    text.len() >= 30
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn unavailable(what: &str, e: impl std::fmt::Display) -> GeoSyncError {
    GeoSyncError::SourceUnavailable(format!("{}: {}", what, e))
}

impl GoogleSheetsStore {
    /// Authenticate, resolve the spreadsheet and check the worksheet exists
    pub async fn open(settings: &Settings, spreadsheet: &str, worksheet: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        let key = ServiceAccountKey::from_file(&settings.credentials_path)?;
        let token = fetch_access_token(&client, &key, SCOPES).await?;

        let mut store = Self {
            client,
            token,
            spreadsheet_id: String::new(),
            worksheet: worksheet.to_string(),
        };

        store.spreadsheet_id = if looks_like_spreadsheet_id(spreadsheet) {
            spreadsheet.to_string()
        } else {
            store.find_by_name(spreadsheet).await?
        };
        store.check_worksheet().await?;

        tracing::info!("Opened spreadsheet '{}' / sheet '{}'", spreadsheet, worksheet);
        Ok(store)
    }

    async fn find_by_name(&self, name: &str) -> Result<String> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            name.replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let response = self
            .client
            .get(DRIVE_FILES_API)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(|e| unavailable(name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(name, format!("Drive search returned {}: {}", status, body)));
        }

        let list: DriveFileList = response.json().await.map_err(|e| unavailable(name, e))?;
        let mut files = list.files.into_iter();
        let first = files
            .next()
            .ok_or_else(|| unavailable(name, "no spreadsheet with this name is shared with the service account"))?;
        if files.next().is_some() {
            tracing::warn!("Several spreadsheets named '{}'; using {}", first.name, first.id);
        }
        Ok(first.id)
    }

    async fn check_worksheet(&self) -> Result<()> {
        let url = format!("{}/{}", SHEETS_API, self.spreadsheet_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await
            .map_err(|e| unavailable(&self.spreadsheet_id, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(&self.spreadsheet_id, format!("{}: {}", status, body)));
        }

        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| unavailable(&self.spreadsheet_id, e))?;
        if meta.sheets.iter().any(|s| s.properties.title == self.worksheet) {
            Ok(())
        } else {
            Err(unavailable(
                &self.worksheet,
                format!("worksheet not found in {}", self.spreadsheet_id),
            ))
        }
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(SHEETS_API)
            .map_err(|e| GeoSyncError::Config(format!("bad Sheets URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GeoSyncError::Config("Sheets URL cannot take path segments".into()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    async fn read_range(&mut self, range: &RangeRef) -> Result<Vec<Vec<String>>> {
        let a1 = range.qualified(&self.worksheet);
        let url = self.values_url(&a1)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await
            .map_err(|e| unavailable(&a1, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(&a1, format!("{}: {}", status, body)));
        }

        let value_range: ValueRange = response.json().await.map_err(|e| unavailable(&a1, e))?;
        tracing::debug!("Read {} rows from {}", value_range.values.len(), a1);
        Ok(value_range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn write_range(&mut self, start: CellRef, values: &[Vec<String>]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let width = values.iter().map(Vec::len).max().unwrap_or(1);
        let block = RangeRef::block(start, values.len() as u32, width as u32);
        let a1 = block.qualified(&self.worksheet);
        let url = self.values_url(&a1)?;

        let body = json!({
            "range": a1,
            "majorDimension": "ROWS",
            "values": values,
        });

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .map_err(|e| GeoSyncError::WriteFailed(format!("{}: {}", a1, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeoSyncError::WriteFailed(format!("{} returned {}: {}", a1, status, text)));
        }

        tracing::info!("Wrote {} rows to {}", values.len(), a1);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("google:{}/{}", self.spreadsheet_id, self.worksheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_id_detection() {
        assert!(looks_like_spreadsheet_id("1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms"));
        assert!(!looks_like_spreadsheet_id("no_polygon"));
        assert!(!looks_like_spreadsheet_id("a spreadsheet with a long long long name"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("Gudauri")), "Gudauri");
        assert_eq!(cell_text(&json!(42.48)), "42.48");
        assert_eq!(cell_text(&Value::Null), "");
    }
}
