//! Output column schemas
//!
//! A schema fixes the width and order of the output block. Every field
//! renders to exactly one cell, so a row never shrinks when data is missing.

use crate::types::Place;
use serde::{Deserialize, Serialize};

/// Which part of a lookup result goes into a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputField {
    Latitude,
    Longitude,
    OsmId,
    OsmType,
    Class,
    Type,
    Geometry,
    BboxWest,
    BboxSouth,
    BboxEast,
    BboxNorth,
    DisplayName,
    LocalizedName,
}

impl OutputField {
    pub fn default_header(&self) -> &'static str {
        match self {
            OutputField::Latitude => "Latitude",
            OutputField::Longitude => "Longitude",
            OutputField::OsmId => "OSM_ID",
            OutputField::OsmType => "OSM_Type",
            OutputField::Class => "Class",
            OutputField::Type => "Type",
            OutputField::Geometry => "Geometry",
            OutputField::BboxWest => "BBOX_West",
            OutputField::BboxSouth => "BBOX_South",
            OutputField::BboxEast => "BBOX_East",
            OutputField::BboxNorth => "BBOX_North",
            OutputField::DisplayName => "Display_Name",
            OutputField::LocalizedName => "Localized_Name",
        }
    }

    /// Cell text for this field, `None` when the place lacks it
    pub fn extract(&self, place: &Place) -> Option<String> {
        match self {
            OutputField::Latitude => place.lat.map(format_coordinate),
            OutputField::Longitude => place.lon.map(format_coordinate),
            OutputField::OsmId => place.osm_id.map(|id| id.to_string()),
            OutputField::OsmType => place.osm_type.clone(),
            OutputField::Class => place.class.clone(),
            OutputField::Type => place.kind.clone(),
            OutputField::Geometry => place.geometry.clone(),
            OutputField::BboxWest => place.bbox.map(|b| format_coordinate(b.west)),
            OutputField::BboxSouth => place.bbox.map(|b| format_coordinate(b.south)),
            OutputField::BboxEast => place.bbox.map(|b| format_coordinate(b.east)),
            OutputField::BboxNorth => place.bbox.map(|b| format_coordinate(b.north)),
            OutputField::DisplayName => place.display_name.clone(),
            OutputField::LocalizedName => place.localized_name.clone(),
        }
        .filter(|value| !value.is_empty())
    }
}

/// Always a dot as decimal separator, no trailing zeros
pub fn format_coordinate(value: f64) -> String {
    format!("{}", value)
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    pub field: OutputField,
    #[serde(default)]
    pub header: Option<String>,
}

impl OutputColumn {
    pub fn header(&self) -> &str {
        self.header
            .as_deref()
            .unwrap_or_else(|| self.field.default_header())
    }
}

impl From<OutputField> for OutputColumn {
    fn from(field: OutputField) -> Self {
        Self { field, header: None }
    }
}

/// Ordered, fixed-width output schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSchema {
    columns: Vec<OutputColumn>,
}

impl OutputSchema {
    pub fn new(columns: Vec<OutputColumn>) -> Self {
        Self { columns }
    }

    pub fn from_fields(fields: &[OutputField]) -> Self {
        Self::new(fields.iter().copied().map(OutputColumn::from).collect())
    }

    /// Columns written by the polygon enrichment (H..S in the region sheet)
    pub fn polygons() -> Self {
        let mut schema = Self::from_fields(&[
            OutputField::Latitude,
            OutputField::Longitude,
            OutputField::OsmId,
            OutputField::OsmType,
            OutputField::Class,
            OutputField::Type,
            OutputField::Geometry,
            OutputField::BboxWest,
            OutputField::BboxSouth,
            OutputField::BboxEast,
            OutputField::BboxNorth,
            OutputField::LocalizedName,
        ]);
        if let Some(last) = schema.columns.last_mut() {
            last.header = Some("Russian_Name".into());
        }
        schema
    }

    /// Columns written for ski lifts
    pub fn lifts() -> Self {
        Self::new(vec![
            OutputColumn { field: OutputField::Latitude, header: Some("lat".into()) },
            OutputColumn { field: OutputField::Longitude, header: Some("lon".into()) },
            OutputColumn { field: OutputField::OsmId, header: Some("osm_id".into()) },
            OutputColumn { field: OutputField::Class, header: Some("osm_class".into()) },
            OutputColumn { field: OutputField::Type, header: Some("osm_type".into()) },
        ])
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header().to_string()).collect()
    }

    pub fn uses(&self, field: OutputField) -> bool {
        self.columns.iter().any(|c| c.field == field)
    }

    /// Render one row. `None` renders every column as `empty`.
    pub fn render(&self, place: Option<&Place>, empty: &str) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                place
                    .and_then(|p| column.field.extract(p))
                    .unwrap_or_else(|| empty.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn chair_lift() -> Place {
        Place {
            lat: Some(42.48),
            lon: Some(44.48),
            osm_id: Some(123),
            class: Some("aerialway".into()),
            kind: Some("chair_lift".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_lifts_render_found() {
        let row = OutputSchema::lifts().render(Some(&chair_lift()), "");
        assert_eq!(row, vec!["42.48", "44.48", "123", "aerialway", "chair_lift"]);
    }

    #[test]
    fn test_lifts_render_not_found_keeps_width() {
        let row = OutputSchema::lifts().render(None, "");
        assert_eq!(row, vec!["", "", "", "", ""]);
    }

    #[test]
    fn test_partial_place_fills_gaps() {
        let place = Place {
            lat: Some(41.7),
            ..Default::default()
        };
        let row = OutputSchema::lifts().render(Some(&place), "Not Found");
        assert_eq!(row, vec!["41.7", "Not Found", "Not Found", "Not Found", "Not Found"]);
    }

    #[test]
    fn test_polygons_schema_headers() {
        let schema = OutputSchema::polygons();
        assert_eq!(schema.width(), 12);
        let headers = schema.headers();
        assert_eq!(headers[0], "Latitude");
        assert_eq!(headers[7], "BBOX_West");
        assert_eq!(headers[11], "Russian_Name");
        assert!(schema.uses(OutputField::LocalizedName));
    }

    #[test]
    fn test_polygons_render_bbox_order() {
        let place = Place {
            bbox: Some(BoundingBox {
                west: 44.4,
                south: 42.4,
                east: 44.6,
                north: 42.5,
            }),
            ..Default::default()
        };
        let row = OutputSchema::polygons().render(Some(&place), "");
        assert_eq!(&row[7..11], &["44.4", "42.4", "44.6", "42.5"]);
    }

    #[test]
    fn test_empty_string_field_counts_as_missing() {
        let place = Place {
            class: Some(String::new()),
            ..Default::default()
        };
        let row = OutputSchema::from_fields(&[OutputField::Class]).render(Some(&place), "-");
        assert_eq!(row, vec!["-"]);
    }

    #[test]
    fn test_schema_serde() {
        let json = r#"[{"field":"latitude"},{"field":"localized_name","header":"Name RU"}]"#;
        let schema: OutputSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.headers(), vec!["Latitude", "Name RU"]);
    }
}
