//! Admin → sheet extraction pass
//!
//! Opens the change page of every numeric entity id in a column and reads
//! the configured fields into a block aligned with the id rows.

use super::AdminConsole;
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use crate::logging::row_progress;
use crate::sheets::{read_rows, TabularStore};
use geo_sync_common::{change_url, CellRef, ExtractJob, InputRow};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub rows: usize,
    pub read: usize,
    /// Ids that are not numeric
    pub skipped: usize,
    /// Pages that did not load
    pub failed: usize,
}

impl fmt::Display for ExtractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} read, {} skipped, {} failed",
            self.rows, self.read, self.skipped, self.failed
        )
    }
}

pub fn is_entity_id(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

pub struct ExtractionPass {
    job: ExtractJob,
    list_url: String,
    show_progress: bool,
}

impl ExtractionPass {
    pub fn new(job: ExtractJob, settings: &Settings) -> Self {
        Self {
            list_url: settings.admin_page(&job.entity_path),
            show_progress: false,
            job,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn run(
        &mut self,
        console: &mut dyn AdminConsole,
        store: &mut dyn TabularStore,
    ) -> Result<ExtractReport> {
        self.job.validate()?;
        tracing::info!(
            "[{}] reading ids {} from {}",
            self.job.name,
            self.job.ids,
            store.describe()
        );
        let rows = read_rows(store, &self.job.ids).await?;
        let (values, report) = self.extract_rows(console, &rows).await?;

        let mut block = Vec::with_capacity(values.len() + 1);
        let start = if self.job.write_headers {
            block.push(self.job.headers());
            CellRef::new(self.job.output_start.col, self.job.output_start.row - 1)
        } else {
            self.job.output_start
        };
        block.extend(values);
        if !block.is_empty() {
            store.write_range(start, &block).await?;
        }

        tracing::info!("[{}] {}", self.job.name, report);
        Ok(report)
    }

    /// One row of field values per id row. Pages that fail to load or
    /// render give empty rows; a broken browser session ends the pass.
    pub async fn extract_rows(
        &mut self,
        console: &mut dyn AdminConsole,
        rows: &[InputRow],
    ) -> Result<(Vec<Vec<String>>, ExtractReport)> {
        let progress = if self.show_progress {
            row_progress(rows.len(), &self.job.name)
        } else {
            ProgressBar::hidden()
        };

        let width = self.job.fields.len();
        let mut values = Vec::with_capacity(rows.len());
        let mut report = ExtractReport::default();

        for row in rows {
            report.rows += 1;
            let id = row.cell(0);
            progress.set_message(id.to_string());

            if !is_entity_id(id) {
                if !id.is_empty() {
                    tracing::warn!("Row {}: {:?} is not an entity id", row.row_number, id);
                }
                report.skipped += 1;
                values.push(vec![String::new(); width]);
                progress.inc(1);
                continue;
            }

            match self.extract_page(console, id).await {
                Ok(fields) => {
                    report.read += 1;
                    values.push(fields);
                }
                Err(e @ GeoSyncError::FormInteractionFailed(_)) => {
                    tracing::warn!("Row {}: entity {} not read: {}", row.row_number, id, e);
                    report.failed += 1;
                    values.push(vec![String::new(); width]);
                }
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok((values, report))
    }

    async fn extract_page(&self, console: &mut dyn AdminConsole, id: &str) -> Result<Vec<String>> {
        let url = change_url(&self.list_url, id);
        console.open(&url).await?;
        if let Some(ready) = &self.job.ready {
            console.locate(ready).await?;
        }

        let mut values = Vec::with_capacity(self.job.fields.len());
        for field in &self.job.fields {
            let read = match console.locate(&field.selector).await {
                Ok(handle) => console.read(&handle, &field.read).await,
                Err(e) => Err(e),
            };
            let value = match read {
                Ok(raw) => field.pick.apply(&raw),
                Err(e @ GeoSyncError::FormInteractionFailed(_)) => {
                    tracing::debug!("{}: {} not read: {}", id, field.header, e);
                    String::new()
                }
                Err(e) => return Err(e),
            };
            values.push(value);
        }
        tracing::info!("Entity {}: {}", id, values.join(" | "));
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        assert!(is_entity_id("6053839"));
        assert!(!is_entity_id(""));
        assert!(!is_entity_id("ID"));
        assert!(!is_entity_id("12a"));
    }
}
