//! Built-in jobs
//!
//! One record per known dataset. Anything else goes into a job file.

use crate::admin::{
    ExtractField, FieldKind, FieldSelector, FormField, FormSpec, Pick, ReadMode, ValueSource,
};
use crate::job::{
    EnrichJob, ExtractJob, Job, LocalizeConfig, LookupFailurePolicy, SourceConfig, UploadJob,
};
use crate::query::QueryTemplate;
use crate::range::{CellRef, RangeRef};
use crate::schema::OutputSchema;

const PRESETS: &[(&str, &str)] = &[
    ("no-polygon", "Regions without polygons: Nominatim + Russian name into H..S"),
    ("gudauri-lifts", "Gudauri ski lifts: OSM coordinates into D..H"),
    ("bakuriani-lifts", "Bakuriani ski lifts: OSM coordinates into D..H"),
    ("region-ids", "Region IDs in column A: read admin change pages into B..G"),
    ("lift-upload", "Create ski lifts in the admin console from the lift sheet"),
];

pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

pub fn describe() -> &'static [(&'static str, &'static str)] {
    PRESETS
}

/// Look up a preset by name
pub fn get(name: &str) -> Option<Job> {
    match name.to_lowercase().as_str() {
        "no-polygon" | "no_polygon" => Some(Job::Enrich(no_polygon())),
        "gudauri-lifts" => Some(Job::Enrich(lifts("Gudauri"))),
        "bakuriani-lifts" => Some(Job::Enrich(lifts("Bakuriani"))),
        "region-ids" => Some(Job::Extract(region_ids())),
        "lift-upload" => Some(Job::Upload(lift_upload("Gudauri"))),
        _ => None,
    }
}

fn range(text: &str) -> RangeRef {
    text.parse().unwrap_or_else(|_| unreachable!("preset range {}", text))
}

fn cell(text: &str) -> CellRef {
    text.parse().unwrap_or_else(|_| unreachable!("preset cell {}", text))
}

fn no_polygon() -> EnrichJob {
    EnrichJob {
        name: "no-polygon".into(),
        source: SourceConfig::Google {
            spreadsheet: "no_polygon".into(),
            worksheet: "17-11".into(),
        },
        // B: region name, C: parent name
        input: range("B2:C"),
        query: QueryTemplate::new(vec![0, 1]),
        localize: Some(LocalizeConfig {
            language: "ru".into(),
            query: QueryTemplate::new(vec![0]),
            coordinate_fallback: false,
        }),
        output_start: cell("H2"),
        schema: OutputSchema::polygons(),
        write_headers: true,
        empty_value: String::new(),
        on_lookup_error: LookupFailurePolicy::Degrade,
        country_codes: Vec::new(),
    }
}

fn lifts(resort: &str) -> EnrichJob {
    EnrichJob {
        name: format!("{}-lifts", resort.to_lowercase()),
        source: SourceConfig::Google {
            spreadsheet: "ski_lifts".into(),
            worksheet: resort.into(),
        },
        // A: lift name, B: resort
        input: range("A2:B"),
        query: QueryTemplate::new(vec![0, 1]),
        localize: None,
        output_start: cell("D2"),
        schema: OutputSchema::lifts(),
        write_headers: true,
        empty_value: String::new(),
        on_lookup_error: LookupFailurePolicy::Degrade,
        country_codes: vec!["ge".into()],
    }
}

fn region_ids() -> ExtractJob {
    let parent = FieldSelector::Css("span.select2-selection__rendered".into());
    let parent_read = ReadMode::Attribute("title".into());
    ExtractJob {
        name: "region-ids".into(),
        source: SourceConfig::Google {
            spreadsheet: "no_polygon".into(),
            worksheet: "17-11".into(),
        },
        ids: range("A2:A"),
        entity_path: "geo/region/".into(),
        output_start: cell("B2"),
        ready: Some(FieldSelector::Id("id_translations-0-name".into())),
        fields: vec![
            ExtractField {
                header: "Region name".into(),
                selector: FieldSelector::Id("id_translations-0-name".into()),
                read: ReadMode::Value,
                pick: Pick::Whole,
            },
            ExtractField {
                header: "Parent name".into(),
                selector: parent.clone(),
                read: parent_read.clone(),
                pick: Pick::Part { index: 1, separator: ", ".into() },
            },
            ExtractField {
                header: "Parent ID".into(),
                selector: parent,
                read: parent_read,
                pick: Pick::Part { index: 0, separator: ", ".into() },
            },
            ExtractField {
                header: "Country code".into(),
                selector: FieldSelector::Css("div.form-row.field-country".into()),
                read: ReadMode::Text,
                pick: Pick::LastLine { skip_prefix: "country".into() },
            },
            ExtractField {
                header: "Latitude".into(),
                selector: FieldSelector::Id("id_manual_lat_center".into()),
                read: ReadMode::Value,
                pick: Pick::Whole,
            },
            ExtractField {
                header: "Longitude".into(),
                selector: FieldSelector::Id("id_manual_lon_center".into()),
                read: ReadMode::Value,
                pick: Pick::Whole,
            },
        ],
        write_headers: true,
    }
}

fn lift_upload(resort: &str) -> UploadJob {
    let text = |name: &str, id: &str, index: usize, optional: bool| FormField {
        name: name.into(),
        selector: FieldSelector::Id(id.into()),
        kind: FieldKind::Text,
        value: ValueSource::Column { index },
        optional,
    };

    UploadJob {
        name: "lift-upload".into(),
        source: SourceConfig::Google {
            spreadsheet: "ski_lifts".into(),
            worksheet: resort.into(),
        },
        // A name, B resort, D lat, E lon, F osm_id
        input: range("A2:H"),
        key_column: 0,
        add_path: "geo/region/add/".into(),
        form: FormSpec::new(vec![
            text("name", "id_translations-0-name", 0, false),
            FormField {
                name: "parent".into(),
                selector: FieldSelector::Css(".field-parent .select2-selection".into()),
                kind: FieldKind::Autocomplete,
                value: ValueSource::ParentRegion,
                optional: false,
            },
            FormField {
                name: "type".into(),
                selector: FieldSelector::Id("id_type".into()),
                kind: FieldKind::Select,
                value: ValueSource::EntityType,
                optional: false,
            },
            text("latitude", "id_manual_lat_center", 3, false),
            text("longitude", "id_manual_lon_center", 4, false),
            text("osm_id", "id_osm_id", 5, true),
        ]),
        on_row_failure: LookupFailurePolicy::Degrade,
        status_start: Some(cell("J2")),
    }
}
