//! Admin submission pass
//!
//! Each input row becomes one add-form submission driven through
//! `Navigate → LocateFields → FillFields → Submit → Confirm`. In dry-run
//! mode the form is filled and logged but never saved.

use super::{AdminConsole, Confirmation, FieldHandle};
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use crate::logging::row_progress;
use crate::sheets::{read_rows, TabularStore};
use geo_sync_common::{
    FieldInput, FormContext, FormSubmission, InputRow, LookupFailurePolicy, SubmissionState,
    UploadJob,
};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Final state of one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowResult {
    pub row_number: u32,
    /// Key cell, empty for blank rows
    pub key: String,
    pub state: SubmissionState,
    /// Step that failed
    pub failed_at: Option<SubmissionState>,
    pub object_id: Option<String>,
    pub message: String,
}

impl RowResult {
    fn new(row_number: u32, key: &str) -> Self {
        Self {
            row_number,
            key: key.to_string(),
            state: SubmissionState::Navigate,
            failed_at: None,
            object_id: None,
            message: String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.key.is_empty()
    }

    /// State, object id, message
    pub fn status_cells(&self) -> Vec<String> {
        vec![
            self.state.to_string(),
            self.object_id.clone().unwrap_or_default(),
            self.message.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub rows: usize,
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
    pub blank: usize,
}

impl SubmissionReport {
    pub fn from_results(results: &[RowResult]) -> Self {
        let mut report = Self::default();
        for result in results {
            report.rows += 1;
            if result.is_blank() {
                report.blank += 1;
                continue;
            }
            match result.state {
                SubmissionState::Done => report.done += 1,
                SubmissionState::Skipped => report.skipped += 1,
                _ => report.failed += 1,
            }
        }
        report
    }
}

impl fmt::Display for SubmissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} saved, {} dry-run, {} failed, {} blank",
            self.rows, self.done, self.skipped, self.failed, self.blank
        )
    }
}

#[derive(Serialize)]
struct DryRunRecord<'a> {
    timestamp: String,
    job: &'a str,
    url: &'a str,
    #[serde(flatten)]
    submission: &'a FormSubmission,
}

pub struct SubmissionPass {
    job: UploadJob,
    context: FormContext,
    add_url: String,
    dry_run: bool,
    dry_run_log: Option<PathBuf>,
    show_progress: bool,
}

impl SubmissionPass {
    pub fn new(job: UploadJob, settings: &Settings) -> Self {
        Self {
            add_url: settings.admin_page(&job.add_path),
            context: settings.form_context(),
            dry_run: settings.dry_run,
            dry_run_log: settings.dry_run_log.clone(),
            show_progress: false,
            job,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_dry_run_log(mut self, path: Option<PathBuf>) -> Self {
        self.dry_run_log = path;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Read rows, submit them, write statuses back. With the `Abort`
    /// policy the first failed row ends the pass with an error after the
    /// statuses gathered so far are written.
    pub async fn run(
        &mut self,
        console: &mut dyn AdminConsole,
        store: &mut dyn TabularStore,
    ) -> Result<SubmissionReport> {
        self.job.validate()?;
        tracing::info!(
            "[{}] reading {} from {}{}",
            self.job.name,
            self.job.input,
            store.describe(),
            if self.dry_run { " (dry run)" } else { "" }
        );
        let rows = read_rows(store, &self.job.input).await?;
        let results = self.submit_rows(console, &rows).await?;

        if let Some(start) = self.job.status_start {
            let block: Vec<Vec<String>> = results.iter().map(RowResult::status_cells).collect();
            if !block.is_empty() {
                store.write_range(start, &block).await?;
            }
        }

        let report = SubmissionReport::from_results(&results);
        tracing::info!("[{}] {}", self.job.name, report);

        if self.job.on_row_failure == LookupFailurePolicy::Abort {
            if let Some(failed) = results.iter().find(|r| r.state == SubmissionState::Failed) {
                return Err(GeoSyncError::FormInteractionFailed(format!(
                    "row {} ({}): {}",
                    failed.row_number, failed.key, failed.message
                )));
            }
        }
        Ok(report)
    }

    /// Submit rows in order. Stops after the first failure under `Abort`.
    pub async fn submit_rows(
        &mut self,
        console: &mut dyn AdminConsole,
        rows: &[InputRow],
    ) -> Result<Vec<RowResult>> {
        let progress = if self.show_progress {
            row_progress(rows.len(), &self.job.name)
        } else {
            ProgressBar::hidden()
        };

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.cell(self.job.key_column);
            progress.set_message(key.to_string());

            if key.is_empty() {
                let mut result = RowResult::new(row.row_number, "");
                result.state = SubmissionState::Skipped;
                result.message = "blank".into();
                results.push(result);
                progress.inc(1);
                continue;
            }

            let submission = self.resolve(row);
            let result = self.submit_row(console, &submission, key).await;

            if result.state == SubmissionState::Skipped {
                if let Some(path) = &self.dry_run_log {
                    append_dry_run_record(path, &self.job.name, &self.add_url, &submission)?;
                }
            }

            let stop = result.state == SubmissionState::Failed
                && self.job.on_row_failure == LookupFailurePolicy::Abort;
            results.push(result);
            progress.inc(1);
            if stop {
                tracing::warn!("[{}] stopping after failed row", self.job.name);
                break;
            }
        }

        progress.finish_and_clear();
        Ok(results)
    }

    /// Values for every form field, in form order
    pub fn resolve(&self, row: &InputRow) -> FormSubmission {
        FormSubmission {
            row_number: row.row_number,
            fields: self
                .job
                .form
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.resolve(row, &self.context)))
                .collect(),
        }
    }

    async fn submit_row(
        &self,
        console: &mut dyn AdminConsole,
        submission: &FormSubmission,
        key: &str,
    ) -> RowResult {
        let mut result = RowResult::new(submission.row_number, key);
        let mut handles: Vec<(FieldHandle, FieldInput)> = Vec::new();
        let mut confirmation: Option<Confirmation> = None;
        let mut state = SubmissionState::Navigate;

        while !state.is_terminal() {
            let step = match state {
                SubmissionState::Navigate => console.open(&self.add_url).await,
                SubmissionState::LocateFields => {
                    self.locate_fields(console, submission, &mut handles).await
                }
                SubmissionState::FillFields => fill_fields(console, &handles).await,
                SubmissionState::Submit => console
                    .submit(&self.job.form)
                    .await
                    .map(|c| confirmation = Some(c)),
                SubmissionState::Confirm => match &confirmation {
                    Some(c) if !c.message.is_empty() => Ok(()),
                    _ => Err(GeoSyncError::FormInteractionFailed(
                        "save was not confirmed".into(),
                    )),
                },
                _ => Ok(()),
            };

            match step {
                Ok(()) => {
                    tracing::debug!("Row {} ({}): {} ok", submission.row_number, key, state);
                    state = state.advance(self.dry_run);
                }
                Err(e) => {
                    tracing::warn!("Row {} ({}): {} failed: {}", submission.row_number, key, state, e);
                    result.failed_at = Some(state);
                    result.message = e.to_string();
                    state = SubmissionState::Failed;
                }
            }
        }

        result.state = state;
        match state {
            SubmissionState::Done => {
                if let Some(c) = confirmation {
                    result.object_id = c.object_id;
                    result.message = c.message;
                }
                tracing::info!(
                    "Row {} ({}): saved{}",
                    submission.row_number,
                    key,
                    result
                        .object_id
                        .as_deref()
                        .map(|id| format!(" as {}", id))
                        .unwrap_or_default()
                );
            }
            SubmissionState::Skipped => {
                result.message = "dry run".into();
                tracing::info!("Row {} ({}): filled, not saved (dry run)", submission.row_number, key);
            }
            _ => {}
        }
        result
    }

    async fn locate_fields(
        &self,
        console: &mut dyn AdminConsole,
        submission: &FormSubmission,
        handles: &mut Vec<(FieldHandle, FieldInput)>,
    ) -> Result<()> {
        for (field, (_, input)) in self.job.form.fields.iter().zip(&submission.fields) {
            if input.is_empty() {
                if field.optional {
                    continue;
                }
                return Err(GeoSyncError::FormInteractionFailed(format!(
                    "{} has no value",
                    field.name
                )));
            }
            let handle = console.locate(&field.selector).await?;
            handles.push((handle, input.clone()));
        }
        Ok(())
    }
}

async fn fill_fields(
    console: &mut dyn AdminConsole,
    handles: &[(FieldHandle, FieldInput)],
) -> Result<()> {
    for (handle, input) in handles {
        tracing::debug!("Fill {} with {}", handle.selector, input);
        console.fill(handle, input).await?;
    }
    Ok(())
}

fn append_dry_run_record(
    path: &Path,
    job: &str,
    url: &str,
    submission: &FormSubmission,
) -> Result<()> {
    let record = DryRunRecord {
        timestamp: chrono::Local::now().to_rfc3339(),
        job,
        url,
        submission,
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", serde_json::to_string(&record)?)?;
    Ok(())
}
