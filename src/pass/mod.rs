//! Sheet → geocoder → sheet pass

pub mod enrich;

pub use enrich::EnrichmentPass;

use geo_sync_common::LookupOutcome;
use serde::Serialize;
use std::fmt;

/// Row counts of one enrichment run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub rows: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Lookups that errored and were degraded to empty fields
    pub failed: usize,
    pub skipped_blank: usize,
    /// Localized-name lookups that errored; the row keeps its primary result
    pub localize_failed: usize,
}

impl PassReport {
    pub fn record(&mut self, outcome: &LookupOutcome) {
        self.rows += 1;
        match outcome {
            LookupOutcome::Resolved(_) => self.resolved += 1,
            LookupOutcome::NotFound => self.unresolved += 1,
            LookupOutcome::Failed(_) => self.failed += 1,
            LookupOutcome::Blank => self.skipped_blank += 1,
        }
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} resolved, {} not found, {} failed, {} blank",
            self.rows, self.resolved, self.unresolved, self.failed, self.skipped_blank
        )?;
        if self.localize_failed > 0 {
            write!(f, ", {} names not localized", self.localize_failed)?;
        }
        Ok(())
    }
}
