//! Enrichment pass
//!
//! Reads the input range, looks every row up in order and writes the
//! rendered schema back as a single block aligned with the input rows.

use super::PassReport;
use crate::error::{GeoSyncError, Result};
use crate::geocode::{NameLocalizer, PlaceLookup};
use crate::logging::row_progress;
use crate::sheets::{read_rows, TabularStore};
use geo_sync_common::{CellRef, EnrichJob, InputRow, LookupFailurePolicy, LookupOutcome, OutputRow, Place};
use indicatif::ProgressBar;
use std::time::Duration;

pub struct EnrichmentPass {
    job: EnrichJob,
    lookup: Box<dyn PlaceLookup>,
    localizer: Option<Box<dyn NameLocalizer>>,
    delay: Duration,
    show_progress: bool,
    localize_failures: usize,
}

impl EnrichmentPass {
    pub fn new(job: EnrichJob, lookup: Box<dyn PlaceLookup>) -> Self {
        Self {
            job,
            lookup,
            localizer: None,
            delay: Duration::ZERO,
            show_progress: false,
            localize_failures: 0,
        }
    }

    pub fn with_localizer(mut self, localizer: Box<dyn NameLocalizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// Pause between consecutive lookups
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn job(&self) -> &EnrichJob {
        &self.job
    }

    /// Validate, read, enrich, write. Nothing is written when the pass aborts.
    pub async fn run(&mut self, store: &mut dyn TabularStore) -> Result<PassReport> {
        self.job.validate()?;
        if self.job.localize.is_some() && self.localizer.is_none() {
            return Err(GeoSyncError::Config(format!(
                "job {} localizes names but no localizer is configured",
                self.job.name
            )));
        }

        tracing::info!(
            "[{}] reading {} from {}",
            self.job.name,
            self.job.input,
            store.describe()
        );
        let rows = read_rows(store, &self.job.input).await?;
        if rows.is_empty() {
            tracing::warn!("[{}] input range {} is empty", self.job.name, self.job.input);
        }

        let enriched = self.enrich_rows(&rows).await?;

        let mut report = PassReport::default();
        for (_, outcome) in &enriched {
            report.record(outcome);
        }
        report.localize_failed = self.localize_failures;

        let output: Vec<OutputRow> = enriched.into_iter().map(|(row, _)| row).collect();
        if let Some((start, block)) = self.output_block(&output) {
            store.write_range(start, &block).await?;
        }

        tracing::info!("[{}] {}", self.job.name, report);
        Ok(report)
    }

    /// One output row per input row, same order
    pub async fn enrich_rows(
        &mut self,
        rows: &[InputRow],
    ) -> Result<Vec<(OutputRow, LookupOutcome)>> {
        let progress = if self.show_progress {
            row_progress(rows.len(), &self.job.name)
        } else {
            ProgressBar::hidden()
        };

        let mut output = Vec::with_capacity(rows.len());
        let mut looked_up = false;
        self.localize_failures = 0;

        for row in rows {
            let Some(query) = self.job.query.build(row) else {
                tracing::debug!("Row {}: blank, skipped", row.row_number);
                output.push(self.render(row, LookupOutcome::Blank, None));
                progress.inc(1);
                continue;
            };

            if looked_up && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            looked_up = true;
            progress.set_message(query.clone());

            let (outcome, localized_name) = self.enrich_row(row, &query).await?;
            match &outcome {
                LookupOutcome::Resolved(_) => tracing::info!("Row {}: {} found", row.row_number, query),
                LookupOutcome::NotFound => tracing::info!("Row {}: {} not found", row.row_number, query),
                LookupOutcome::Failed(reason) => {
                    tracing::warn!("Row {}: {} failed: {}", row.row_number, query, reason)
                }
                LookupOutcome::Blank => {}
            }
            output.push(self.render(row, outcome, localized_name));
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(output)
    }

    /// Outcome of the primary lookup, plus a localized name when there is
    /// no place to carry it
    async fn enrich_row(
        &mut self,
        row: &InputRow,
        query: &str,
    ) -> Result<(LookupOutcome, Option<String>)> {
        let found = self.lookup.lookup(query).await;
        let mut place = match found {
            Ok(place) => place,
            Err(e) => return Ok((self.degrade(query, e)?, None)),
        };

        let mut unattached_name = None;
        if let Some(config) = self.job.localize.clone() {
            if let Some(local_query) = config.query.build(row) {
                let answer = match self.localizer.as_mut() {
                    Some(localizer) => localizer.localize(&local_query, &config.language).await,
                    None => Ok(None),
                };
                let localized = match answer {
                    Ok(localized) => localized,
                    Err(e) => {
                        self.skip_localized_name(&local_query, e)?;
                        None
                    }
                };
                if let Some(localized) = localized {
                    if place.is_none() && config.coordinate_fallback && localized.lat.is_some() {
                        place = Some(Place::default());
                    }
                    match place.as_mut() {
                        Some(target) => {
                            target.localized_name = localized.name;
                            if config.coordinate_fallback && !target.has_coordinates() {
                                target.lat = localized.lat;
                                target.lon = localized.lon;
                            }
                        }
                        None => unattached_name = localized.name,
                    }
                }
            }
        }

        let outcome = match place {
            Some(place) => LookupOutcome::Resolved(place),
            None => LookupOutcome::NotFound,
        };
        Ok((outcome, unattached_name))
    }

    /// Apply the failure policy to a primary lookup error
    fn degrade(&self, query: &str, error: GeoSyncError) -> Result<LookupOutcome> {
        if error.is_fatal() {
            return Err(error);
        }
        match self.job.on_lookup_error {
            LookupFailurePolicy::Degrade => Ok(LookupOutcome::Failed(error.to_string())),
            LookupFailurePolicy::Abort => Err(as_lookup_error(query, error)),
        }
    }

    /// Apply the failure policy to a localizer error. Under `Degrade` the
    /// row keeps its primary result and the name column stays empty.
    fn skip_localized_name(&mut self, query: &str, error: GeoSyncError) -> Result<()> {
        if error.is_fatal() {
            return Err(error);
        }
        match self.job.on_lookup_error {
            LookupFailurePolicy::Degrade => {
                tracing::warn!("Localized name for {:?} not fetched: {}", query, error);
                self.localize_failures += 1;
                Ok(())
            }
            LookupFailurePolicy::Abort => Err(as_lookup_error(query, error)),
        }
    }

    fn render(
        &self,
        row: &InputRow,
        outcome: LookupOutcome,
        localized_name: Option<String>,
    ) -> (OutputRow, LookupOutcome) {
        let name_only = match (&outcome, localized_name) {
            (LookupOutcome::NotFound, Some(name)) => Some(Place {
                localized_name: Some(name),
                ..Default::default()
            }),
            _ => None,
        };
        let place = outcome.place().or(name_only.as_ref());
        let cells = self.job.schema.render(place, &self.job.empty_value);
        (
            OutputRow {
                source_row: row.row_number,
                cells,
            },
            outcome,
        )
    }

    /// Top-left cell and values of the single write, headers included
    fn output_block(&self, rows: &[OutputRow]) -> Option<(CellRef, Vec<Vec<String>>)> {
        let mut block = Vec::with_capacity(rows.len() + 1);
        let start = if self.job.write_headers {
            block.push(self.job.schema.headers());
            CellRef::new(self.job.output_start.col, self.job.output_start.row - 1)
        } else {
            self.job.output_start
        };
        block.extend(rows.iter().map(|r| r.cells.clone()));
        if block.is_empty() {
            None
        } else {
            Some((start, block))
        }
    }
}

fn as_lookup_error(query: &str, error: GeoSyncError) -> GeoSyncError {
    match error {
        e @ GeoSyncError::LookupFailed { .. } => e,
        other => GeoSyncError::lookup(query, other),
    }
}
