//! Tabular stores
//!
//! The passes only see `TabularStore`: read a rectangular range, write a
//! rectangular block. Google Sheets is the production store; a local xlsx
//! workbook and an in-memory grid share the same contract.

pub mod auth;
pub mod google;
pub mod memory;
pub mod workbook;

pub use google::GoogleSheetsStore;
pub use memory::MemorySheet;
pub use workbook::WorkbookStore;

use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use geo_sync_common::{CellRef, InputRow, RangeRef, SourceConfig};

#[async_trait]
pub trait TabularStore: Send {
    /// Rows of the range, top to bottom. Trailing empty rows may be omitted.
    async fn read_range(&mut self, range: &RangeRef) -> Result<Vec<Vec<String>>>;

    /// Write `values` as one block starting at `start`
    async fn write_range(&mut self, start: CellRef, values: &[Vec<String>]) -> Result<()>;

    /// For logs
    fn describe(&self) -> String;
}

/// Read a range as input rows, padded to the range width
pub async fn read_rows(store: &mut dyn TabularStore, range: &RangeRef) -> Result<Vec<InputRow>> {
    let width = range.width();
    let mut values = store.read_range(range).await?;
    if let Some(height) = range.height() {
        values.truncate(height);
    }

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, mut cells)| {
            cells.resize(width, String::new());
            InputRow::new(range.start.row + i as u32, cells)
        })
        .collect())
}

/// Open the store a job points at
pub async fn open_store(source: &SourceConfig, settings: &Settings) -> Result<Box<dyn TabularStore>> {
    match source {
        SourceConfig::Google {
            spreadsheet,
            worksheet,
        } => {
            let store = GoogleSheetsStore::open(settings, spreadsheet, worksheet).await?;
            Ok(Box::new(store))
        }
        SourceConfig::Workbook { path, worksheet } => {
            let store = WorkbookStore::open(path, worksheet)?;
            Ok(Box::new(store))
        }
    }
}
