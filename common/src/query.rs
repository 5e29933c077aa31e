//! Lookup query construction

use crate::types::InputRow;
use serde::{Deserialize, Serialize};

fn default_separator() -> String {
    ", ".into()
}

/// Builds a free-text query from input cells.
///
/// The first column is the key: when it is empty no query is produced.
/// Empty context cells are skipped, so `("Tbilisi", "")` becomes `Tbilisi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTemplate {
    /// Column offsets inside the input range
    pub columns: Vec<usize>,
    /// Literal context appended after the cells (e.g. a country)
    #[serde(default)]
    pub suffix: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl QueryTemplate {
    pub fn new(columns: Vec<usize>) -> Self {
        Self {
            columns,
            suffix: Vec::new(),
            separator: default_separator(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix.push(suffix.into());
        self
    }

    pub fn key_column(&self) -> usize {
        self.columns.first().copied().unwrap_or(0)
    }

    pub fn build(&self, row: &InputRow) -> Option<String> {
        let key = row.cell(self.key_column());
        if key.is_empty() {
            return None;
        }

        let parts: Vec<&str> = self
            .columns
            .iter()
            .map(|&c| row.cell(c))
            .chain(self.suffix.iter().map(|s| s.trim()))
            .filter(|part| !part.is_empty())
            .collect();

        Some(parts.join(&self.separator))
    }

    /// Highest column offset the template reads
    pub fn max_column(&self) -> usize {
        self.columns.iter().copied().max().unwrap_or(0)
    }
}
