//! Admin console automation
//!
//! The admin site has no API, so its forms are driven through a browser.
//! Passes talk to `AdminConsole`; `WebDriverConsole` is the chromedriver
//! implementation.

pub mod extract;
pub mod login;
pub mod submit;
pub mod webdriver;

pub use extract::{ExtractReport, ExtractionPass};
pub use submit::{RowResult, SubmissionPass, SubmissionReport};
pub use webdriver::WebDriverConsole;

use crate::error::Result;
use async_trait::async_trait;
use geo_sync_common::{FieldInput, FieldSelector, FormSpec, ReadMode};
use serde::Serialize;

/// A located page element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    pub selector: FieldSelector,
    /// Driver-side element reference
    pub element: String,
}

/// What the admin reported after a save
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub message: String,
    pub url: String,
    /// Id of the created object, when the page reveals it
    pub object_id: Option<String>,
}

#[async_trait]
pub trait AdminConsole: Send {
    async fn open(&mut self, url: &str) -> Result<()>;

    async fn current_url(&mut self) -> Result<String>;

    /// Wait for an element; `FormInteractionFailed` when it never shows up
    async fn locate(&mut self, selector: &FieldSelector) -> Result<FieldHandle>;

    async fn fill(&mut self, field: &FieldHandle, input: &FieldInput) -> Result<()>;

    async fn click(&mut self, field: &FieldHandle) -> Result<()>;

    async fn read(&mut self, field: &FieldHandle, mode: &ReadMode) -> Result<String>;

    /// Press the form's save button and wait for the success or error message
    async fn submit(&mut self, form: &FormSpec) -> Result<Confirmation>;
}
