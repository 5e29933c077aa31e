//! geo-sheet-sync shared library
//!
//! Row, range, schema and job types plus response parsing. No I/O beyond
//! reading job files, so everything here is unit-testable.

pub mod admin;
pub mod error;
pub mod job;
pub mod presets;
pub mod query;
pub mod range;
pub mod response;
pub mod schema;
pub mod types;

pub use admin::{
    change_url, clean_select_label, ExtractField, FieldInput, FieldKind, FieldSelector,
    FormContext, FormField, FormSpec, FormSubmission, Pick, ReadMode, SubmissionState,
    ValueSource,
};
pub use error::{Error, Result};
pub use job::{
    EnrichJob, ExtractJob, Job, LocalizeConfig, LookupFailurePolicy, SourceConfig, UploadJob,
};
pub use query::QueryTemplate;
pub use range::{CellRef, RangeRef};
pub use response::{parse_google_geocode, parse_nominatim};
pub use schema::{OutputColumn, OutputField, OutputSchema};
pub use types::{BoundingBox, InputRow, LocalizedPlace, LookupOutcome, OutputRow, Place};
