//! Local xlsx workbook store
//!
//! The whole workbook is held in memory as text grids. A write updates the
//! grid and saves every sheet back to the same file.

use super::memory::slice_grid;
use super::TabularStore;
use crate::error::{GeoSyncError, Result};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Reader};
use geo_sync_common::{CellRef, RangeRef};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

pub struct WorkbookStore {
    path: PathBuf,
    worksheet: String,
    /// (sheet name, grid) in workbook order
    sheets: Vec<(String, Vec<Vec<String>>)>,
}

impl WorkbookStore {
    pub fn open(path: impl AsRef<Path>, worksheet: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut workbook = open_workbook_auto(&path).map_err(|e| {
            GeoSyncError::SourceUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let mut grid: Vec<Vec<String>> = Vec::new();
            if let Some((first_row, first_col)) = range.start() {
                grid.resize(first_row as usize, Vec::new());
                for row in range.rows() {
                    let mut line = vec![String::new(); first_col as usize];
                    line.extend(row.iter().map(|cell| cell.to_string()));
                    grid.push(line);
                }
            }
            sheets.push((name, grid));
        }

        if !sheets.iter().any(|(name, _)| name == worksheet) {
            return Err(GeoSyncError::SourceUnavailable(format!(
                "worksheet '{}' not found in {}",
                worksheet,
                path.display()
            )));
        }

        tracing::info!("Opened workbook {} / sheet '{}'", path.display(), worksheet);
        Ok(Self {
            path,
            worksheet: worksheet.to_string(),
            sheets,
        })
    }

    fn grid(&self) -> &[Vec<String>] {
        self.sheets
            .iter()
            .find(|(name, _)| *name == self.worksheet)
            .map(|(_, grid)| grid.as_slice())
            .unwrap_or(&[])
    }

    fn grid_mut(&mut self) -> Option<&mut Vec<Vec<String>>> {
        self.sheets
            .iter_mut()
            .find(|(name, _)| *name == self.worksheet)
            .map(|(_, grid)| grid)
    }

    fn save(&self) -> Result<()> {
        let mut workbook = Workbook::new();
        for (name, grid) in &self.sheets {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name)?;
            for (r, row) in grid.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if !value.is_empty() {
                        sheet.write_string(r as u32, c as u16, value)?;
                    }
                }
            }
        }
        workbook.save(&self.path)?;
        Ok(())
    }
}

#[async_trait]
impl TabularStore for WorkbookStore {
    async fn read_range(&mut self, range: &RangeRef) -> Result<Vec<Vec<String>>> {
        Ok(slice_grid(self.grid(), range))
    }

    async fn write_range(&mut self, start: CellRef, values: &[Vec<String>]) -> Result<()> {
        let grid = self
            .grid_mut()
            .ok_or_else(|| GeoSyncError::WriteFailed("worksheet disappeared".into()))?;

        for (r, row) in values.iter().enumerate() {
            let line_idx = start.row as usize - 1 + r;
            if grid.len() <= line_idx {
                grid.resize(line_idx + 1, Vec::new());
            }
            let line = &mut grid[line_idx];
            for (c, value) in row.iter().enumerate() {
                let col = start.col as usize + c;
                if line.len() <= col {
                    line.resize(col + 1, String::new());
                }
                line[col] = value.clone();
            }
        }

        self.save()
            .map_err(|e| GeoSyncError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;
        tracing::info!("Wrote {} rows to {}", values.len(), self.describe());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("workbook:{}/{}", self.path.display(), self.worksheet)
    }
}
