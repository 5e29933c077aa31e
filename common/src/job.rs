//! Job records
//!
//! A job is the per-dataset configuration of one pass: where the rows are,
//! how to query, what to write. Jobs are plain data so one pipeline can
//! serve every resort and region list.

use crate::admin::{ExtractField, FormSpec};
use crate::error::{Error, Result};
use crate::query::QueryTemplate;
use crate::range::{CellRef, RangeRef};
use crate::schema::OutputSchema;
use serde::{Deserialize, Serialize};

/// Where the tabular data lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SourceConfig {
    /// Google spreadsheet by name or ID
    Google {
        spreadsheet: String,
        worksheet: String,
    },
    /// Local .xlsx workbook
    Workbook {
        path: String,
        worksheet: String,
    },
}

impl SourceConfig {
    pub fn worksheet(&self) -> &str {
        match self {
            SourceConfig::Google { worksheet, .. } | SourceConfig::Workbook { worksheet, .. } => {
                worksheet
            }
        }
    }

    pub fn set_worksheet(&mut self, name: impl Into<String>) {
        match self {
            SourceConfig::Google { worksheet, .. } | SourceConfig::Workbook { worksheet, .. } => {
                *worksheet = name.into()
            }
        }
    }
}

/// What happens to a row whose lookup errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Record empty fields and continue
    #[default]
    Degrade,
    /// Stop the pass; nothing is written
    Abort,
}

fn default_language() -> String {
    "ru".into()
}

/// Secondary lookup for a localized name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizeConfig {
    #[serde(default = "default_language")]
    pub language: String,
    pub query: QueryTemplate,
    /// Use the localizer's coordinates when the primary lookup found nothing
    #[serde(default)]
    pub coordinate_fallback: bool,
}

/// Sheet -> geocoder -> sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichJob {
    pub name: String,
    pub source: SourceConfig,
    /// Input block, e.g. `B2:C`
    pub input: RangeRef,
    pub query: QueryTemplate,
    #[serde(default)]
    pub localize: Option<LocalizeConfig>,
    /// First output cell, aligned with the first input row
    pub output_start: CellRef,
    pub schema: OutputSchema,
    /// Write schema headers in the row above `output_start`
    #[serde(default)]
    pub write_headers: bool,
    #[serde(default)]
    pub empty_value: String,
    #[serde(default)]
    pub on_lookup_error: LookupFailurePolicy,
    /// ISO country codes passed to the geocoder
    #[serde(default)]
    pub country_codes: Vec<String>,
}

/// Sheet -> admin form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadJob {
    pub name: String,
    pub source: SourceConfig,
    pub input: RangeRef,
    /// Column offset whose emptiness marks a row to skip
    #[serde(default)]
    pub key_column: usize,
    /// Add-page URL, relative to the admin URL when not absolute
    pub add_path: String,
    pub form: FormSpec,
    #[serde(default)]
    pub on_row_failure: LookupFailurePolicy,
    /// Where to write [state, object id, message] per row
    #[serde(default)]
    pub status_start: Option<CellRef>,
}

/// Admin change pages -> sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractJob {
    pub name: String,
    pub source: SourceConfig,
    /// Single column of numeric entity IDs
    pub ids: RangeRef,
    /// Admin list URL of the entity, e.g. `.../admin/geo/region/`
    #[serde(default)]
    pub entity_path: String,
    pub output_start: CellRef,
    /// Wait for this field before reading the page
    #[serde(default)]
    pub ready: Option<crate::admin::FieldSelector>,
    pub fields: Vec<ExtractField>,
    #[serde(default)]
    pub write_headers: bool,
}

/// Output must not overlap the input it is derived from
pub fn ensure_disjoint(input: &RangeRef, output: &RangeRef) -> Result<()> {
    if input.intersects(output) {
        return Err(Error::Config(format!(
            "output range {} overlaps input range {}",
            output, input
        )));
    }
    Ok(())
}

/// Output block including an optional header row, unbounded downward
pub fn output_footprint(start: CellRef, width: usize, headers: bool) -> Result<RangeRef> {
    let top = if headers {
        if start.row < 2 {
            return Err(Error::Config(format!(
                "headers need a free row above {}",
                start
            )));
        }
        CellRef::new(start.col, start.row - 1)
    } else {
        start
    };
    Ok(RangeRef::open_block(top, width as u32))
}

impl EnrichJob {
    pub fn validate(&self) -> Result<()> {
        if self.schema.is_empty() {
            return Err(Error::Config(format!("job {}: empty output schema", self.name)));
        }
        if self.query.columns.is_empty() {
            return Err(Error::Config(format!("job {}: query has no columns", self.name)));
        }
        if self.query.max_column() >= self.input.width() {
            return Err(Error::Config(format!(
                "job {}: query column {} outside input {}",
                self.name,
                self.query.max_column(),
                self.input
            )));
        }
        if let Some(localize) = &self.localize {
            if localize.query.max_column() >= self.input.width() {
                return Err(Error::Config(format!(
                    "job {}: localize column outside input {}",
                    self.name, self.input
                )));
            }
        }
        if self.output_start.row != self.input.start.row {
            return Err(Error::Config(format!(
                "job {}: output {} must start on input row {}",
                self.name, self.output_start, self.input.start.row
            )));
        }
        let footprint = output_footprint(self.output_start, self.schema.width(), self.write_headers)?;
        ensure_disjoint(&self.input, &footprint)
    }
}

impl UploadJob {
    pub fn validate(&self) -> Result<()> {
        if self.form.fields.is_empty() {
            return Err(Error::Config(format!("job {}: form has no fields", self.name)));
        }
        if self.key_column >= self.input.width() {
            return Err(Error::Config(format!(
                "job {}: key column outside input {}",
                self.name, self.input
            )));
        }
        if let Some(start) = self.status_start {
            if start.row != self.input.start.row {
                return Err(Error::Config(format!(
                    "job {}: status {} must start on input row {}",
                    self.name, start, self.input.start.row
                )));
            }
            ensure_disjoint(&self.input, &RangeRef::open_block(start, 3))?;
        }
        Ok(())
    }
}

impl ExtractJob {
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::Config(format!("job {}: no fields to extract", self.name)));
        }
        if self.ids.width() != 1 {
            return Err(Error::Config(format!(
                "job {}: id range {} must be one column",
                self.name, self.ids
            )));
        }
        if self.output_start.row != self.ids.start.row {
            return Err(Error::Config(format!(
                "job {}: output {} must start on id row {}",
                self.name, self.output_start, self.ids.start.row
            )));
        }
        let footprint = output_footprint(self.output_start, self.fields.len(), self.write_headers)?;
        ensure_disjoint(&self.ids, &footprint)
    }

    pub fn headers(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.header.clone()).collect()
    }
}

/// Any job, as stored in a job file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "pass")]
pub enum Job {
    Enrich(EnrichJob),
    Upload(UploadJob),
    Extract(ExtractJob),
}

impl Job {
    /// Load from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let job: Self = serde_json::from_str(json)?;
        Ok(job)
    }

    pub fn name(&self) -> &str {
        match self {
            Job::Enrich(j) => &j.name,
            Job::Upload(j) => &j.name,
            Job::Extract(j) => &j.name,
        }
    }

    pub fn pass_name(&self) -> &'static str {
        match self {
            Job::Enrich(_) => "enrich",
            Job::Upload(_) => "upload",
            Job::Extract(_) => "extract",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Job::Enrich(j) => j.validate(),
            Job::Upload(j) => j.validate(),
            Job::Extract(j) => j.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;

    #[test]
    fn test_presets_validate() {
        for name in presets::names() {
            let job = presets::get(name).unwrap();
            job.validate().unwrap_or_else(|e| panic!("{}: {}", name, e));
        }
    }

    #[test]
    fn test_overlapping_output_rejected() {
        let Some(Job::Enrich(mut job)) = presets::get("no-polygon") else {
            panic!("preset missing");
        };
        job.output_start = "C2".parse().unwrap();
        let err = job.validate().unwrap_err();
        assert!(format!("{}", err).contains("overlaps"));
    }

    #[test]
    fn test_output_must_align_with_input() {
        let Some(Job::Enrich(mut job)) = presets::get("gudauri-lifts") else {
            panic!("preset missing");
        };
        job.output_start = "H3".parse().unwrap();
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_headers_need_room() {
        assert!(output_footprint("H1".parse().unwrap(), 5, true).is_err());
        let footprint = output_footprint("H2".parse().unwrap(), 5, true).unwrap();
        assert_eq!(footprint.to_string(), "H1:L");
    }

    #[test]
    fn test_query_column_outside_input() {
        let Some(Job::Enrich(mut job)) = presets::get("gudauri-lifts") else {
            panic!("preset missing");
        };
        job.query.columns = vec![0, 5];
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_job_json_roundtrip_fields() {
        let json = r#"{
          "pass": "enrich",
          "name": "custom",
          "source": {"kind": "workbook", "path": "lifts.xlsx", "worksheet": "Sheet1"},
          "input": "A2:B",
          "query": {"columns": [0, 1]},
          "output_start": "D2",
          "schema": [{"field": "latitude"}, {"field": "longitude"}],
          "on_lookup_error": "abort"
        }"#;
        let job = Job::from_json(json).unwrap();
        assert_eq!(job.pass_name(), "enrich");
        let Job::Enrich(enrich) = job else {
            panic!("wrong pass");
        };
        assert_eq!(enrich.on_lookup_error, LookupFailurePolicy::Abort);
        assert_eq!(enrich.empty_value, "");
        assert!(!enrich.write_headers);
        assert_eq!(enrich.source.worksheet(), "Sheet1");
        enrich.validate().unwrap();
    }

    #[test]
    fn test_set_worksheet() {
        let mut source = SourceConfig::Google {
            spreadsheet: "no_polygon".into(),
            worksheet: "17-11".into(),
        };
        source.set_worksheet("18-11");
        assert_eq!(source.worksheet(), "18-11");
    }
}
