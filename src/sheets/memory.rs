//! In-memory grid, used for tests and dry previews

use super::TabularStore;
use crate::error::{GeoSyncError, Result};
use async_trait::async_trait;
use geo_sync_common::{CellRef, RangeRef};

#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    /// Row 0 is sheet row 1
    grid: Vec<Vec<String>>,
    /// Every block written, in call order
    pub writes: Vec<(CellRef, Vec<Vec<String>>)>,
    /// Reject writes, simulating a quota or permission error
    pub fail_writes: bool,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build from rows starting at A1
    pub fn from_rows(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let grid = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        Self {
            name: name.into(),
            grid,
            ..Default::default()
        }
    }

    pub fn cell(&self, cell: &str) -> String {
        let Ok(cell) = cell.parse::<CellRef>() else {
            return String::new();
        };
        self.grid
            .get(cell.row as usize - 1)
            .and_then(|row| row.get(cell.col as usize))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&mut self, cell: CellRef, value: &str) {
        let row = cell.row as usize - 1;
        let col = cell.col as usize;
        if self.grid.len() <= row {
            self.grid.resize(row + 1, Vec::new());
        }
        let line = &mut self.grid[row];
        if line.len() <= col {
            line.resize(col + 1, String::new());
        }
        line[col] = value.to_string();
    }

    pub fn grid(&self) -> &[Vec<String>] {
        &self.grid
    }
}

/// Cut a range out of a grid like the Sheets API does: trailing empty
/// cells and trailing empty rows are dropped.
pub(crate) fn slice_grid(grid: &[Vec<String>], range: &RangeRef) -> Vec<Vec<String>> {
    let first = range.start.row as usize - 1;
    let last = range
        .end_row
        .map(|r| r as usize)
        .unwrap_or(grid.len())
        .min(grid.len());

    let mut rows: Vec<Vec<String>> = (first..last)
        .map(|r| {
            let line = &grid[r];
            let mut cells: Vec<String> = (range.start.col..=range.end_col)
                .map(|c| line.get(c as usize).cloned().unwrap_or_default())
                .collect();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            cells
        })
        .collect();

    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

#[async_trait]
impl TabularStore for MemorySheet {
    async fn read_range(&mut self, range: &RangeRef) -> Result<Vec<Vec<String>>> {
        Ok(slice_grid(&self.grid, range))
    }

    async fn write_range(&mut self, start: CellRef, values: &[Vec<String>]) -> Result<()> {
        if self.fail_writes {
            return Err(GeoSyncError::WriteFailed(format!(
                "{}: write at {} rejected",
                self.name, start
            )));
        }
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                self.set(CellRef::new(start.col + c as u32, start.row + r as u32), value);
            }
        }
        self.writes.push((start, values.to_vec()));
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_drops_trailing_empties() {
        let sheet = MemorySheet::from_rows(
            "t",
            &[
                &["id", "name", "parent"],
                &["1", "Gudauri", ""],
                &["2", "", ""],
                &["", "", ""],
            ],
        );
        let range: RangeRef = "B2:C".parse().unwrap();
        let rows = slice_grid(sheet.grid(), &range);
        assert_eq!(rows, vec![vec!["Gudauri".to_string()]]);
    }

    #[test]
    fn test_slice_bounded() {
        let sheet = MemorySheet::from_rows("t", &[&["a"], &["b"], &["c"]]);
        let range: RangeRef = "A1:A2".parse().unwrap();
        assert_eq!(slice_grid(sheet.grid(), &range).len(), 2);
    }

    #[test]
    fn test_set_grows_grid() {
        let mut sheet = MemorySheet::new("t");
        sheet.set("C3".parse().unwrap(), "x");
        assert_eq!(sheet.cell("C3"), "x");
        assert_eq!(sheet.cell("A1"), "");
        assert_eq!(sheet.cell("Z99"), "");
    }
}
