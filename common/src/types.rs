//! Row and lookup result types
//!
//! Everything here lives for one pass only. Cells are plain strings, as the
//! Sheets API returns them.

use serde::{Deserialize, Serialize};

/// One row read from the input range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
    /// 1-based sheet row number
    pub row_number: u32,
    /// Cells relative to the first input column
    pub cells: Vec<String>,
}

impl InputRow {
    pub fn new(row_number: u32, cells: Vec<String>) -> Self {
        Self { row_number, cells }
    }

    /// Trimmed cell value, empty when the column is out of range
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(|c| c.trim()).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// One row to be written, aligned with its source row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub source_row: u32,
    pub cells: Vec<String>,
}

impl OutputRow {
    /// Row of `width` copies of `empty`
    pub fn empty(source_row: u32, width: usize, empty: &str) -> Self {
        Self {
            source_row,
            cells: vec![empty.to_string(); width],
        }
    }
}

/// Bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// Result of a place lookup. Absent fields mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub osm_id: Option<u64>,
    /// node / way / relation
    #[serde(default)]
    pub osm_type: Option<String>,
    /// OSM class, e.g. `aerialway`
    #[serde(default)]
    pub class: Option<String>,
    /// OSM type within the class, e.g. `chair_lift`
    #[serde(default)]
    pub kind: Option<String>,
    /// GeoJSON geometry type (Point, Polygon, ...)
    #[serde(default)]
    pub geometry: Option<String>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Name in the localizer's target language
    #[serde(default)]
    pub localized_name: Option<String>,
}

impl Place {
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// Result of the secondary (localized name) lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedPlace {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// How a row ended up after the lookup step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LookupOutcome {
    Resolved(Place),
    NotFound,
    /// Key cell was empty, no lookup made
    Blank,
    /// Lookup errored and the pass degraded to empty fields
    Failed(String),
}

impl LookupOutcome {
    pub fn place(&self) -> Option<&Place> {
        match self {
            LookupOutcome::Resolved(place) => Some(place),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_row_cell_trims_and_pads() {
        let row = InputRow::new(2, vec![" Gudauri Lift 3 ".into(), "Gudauri".into()]);
        assert_eq!(row.cell(0), "Gudauri Lift 3");
        assert_eq!(row.cell(1), "Gudauri");
        assert_eq!(row.cell(5), "");
    }

    #[test]
    fn test_input_row_blank() {
        assert!(InputRow::new(3, vec!["".into(), "  ".into()]).is_blank());
        assert!(InputRow::new(3, vec![]).is_blank());
        assert!(!InputRow::new(3, vec!["x".into()]).is_blank());
    }

    #[test]
    fn test_output_row_empty_keeps_width() {
        let row = OutputRow::empty(7, 5, "");
        assert_eq!(row.source_row, 7);
        assert_eq!(row.cells.len(), 5);
        assert!(row.cells.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_place_coordinates() {
        let mut place = Place::default();
        assert!(!place.has_coordinates());
        place.lat = Some(42.48);
        assert!(!place.has_coordinates());
        place.lon = Some(44.48);
        assert!(place.has_coordinates());
    }
}
