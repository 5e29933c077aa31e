//! Admin console form model
//!
//! Describes which page elements to touch and with what values, without
//! knowing how the browser is driven.

use crate::types::InputRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an element is found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "value")]
pub enum FieldSelector {
    Id(String),
    Name(String),
    Css(String),
    XPath(String),
}

impl FieldSelector {
    /// (strategy, value) pair as used by WebDriver `find element`
    pub fn locator(&self) -> (&'static str, String) {
        match self {
            FieldSelector::Id(id) => ("css selector", format!("[id=\"{}\"]", id)),
            FieldSelector::Name(name) => ("css selector", format!("[name=\"{}\"]", name)),
            FieldSelector::Css(css) => ("css selector", css.clone()),
            FieldSelector::XPath(xpath) => ("xpath", xpath.clone()),
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSelector::Id(v) => write!(f, "#{}", v),
            FieldSelector::Name(v) => write!(f, "[name={}]", v),
            FieldSelector::Css(v) => write!(f, "{}", v),
            FieldSelector::XPath(v) => write!(f, "xpath:{}", v),
        }
    }
}

/// Widget type of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain input or textarea
    Text,
    /// Native `<select>`, option picked by visible text
    Select,
    /// select2 autocomplete: type search text, pick option by visible text
    Autocomplete,
}

/// Where a field's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "from")]
pub enum ValueSource {
    /// Input cell by offset
    Column { index: usize },
    Literal { value: String },
    /// Parent region search/visible text from settings
    ParentRegion,
    /// Entity type visible text from settings
    EntityType,
}

/// Per-deployment selector texts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormContext {
    pub parent_search_text: String,
    pub parent_visible_text: String,
    pub entity_type_visible_text: String,
}

/// Value ready to be typed/picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldInput {
    Text { value: String },
    Choice { visible_text: String },
    Search { search_text: String, visible_text: String },
}

impl FieldInput {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldInput::Text { value } => value.is_empty(),
            FieldInput::Choice { visible_text } => visible_text.is_empty(),
            FieldInput::Search { visible_text, .. } => visible_text.is_empty(),
        }
    }
}

impl fmt::Display for FieldInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldInput::Text { value } => write!(f, "{:?}", value),
            FieldInput::Choice { visible_text } => write!(f, "choose {:?}", visible_text),
            FieldInput::Search {
                search_text,
                visible_text,
            } => write!(f, "search {:?} -> {:?}", search_text, visible_text),
        }
    }
}

/// One field of the add/change form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Label for logs
    pub name: String,
    pub selector: FieldSelector,
    pub kind: FieldKind,
    pub value: ValueSource,
    /// Skip the field when its value is empty instead of failing the row
    #[serde(default)]
    pub optional: bool,
}

impl FormField {
    pub fn resolve(&self, row: &InputRow, context: &FormContext) -> FieldInput {
        let (search, visible) = match &self.value {
            ValueSource::Column { index } => {
                let cell = row.cell(*index).to_string();
                (cell.clone(), cell)
            }
            ValueSource::Literal { value } => (value.clone(), value.clone()),
            ValueSource::ParentRegion => (
                context.parent_search_text.clone(),
                context.parent_visible_text.clone(),
            ),
            ValueSource::EntityType => (
                context.entity_type_visible_text.clone(),
                context.entity_type_visible_text.clone(),
            ),
        };

        match self.kind {
            FieldKind::Text => FieldInput::Text { value: visible },
            FieldKind::Select => FieldInput::Choice {
                visible_text: visible,
            },
            FieldKind::Autocomplete => FieldInput::Search {
                search_text: search,
                visible_text: visible,
            },
        }
    }
}

fn default_submit() -> FieldSelector {
    FieldSelector::Name("_save".into())
}

fn default_success() -> FieldSelector {
    FieldSelector::Css(".messagelist .success".into())
}

fn default_errors() -> FieldSelector {
    FieldSelector::Css(".errornote, .errorlist".into())
}

/// Form page layout (Django admin defaults)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSpec {
    pub fields: Vec<FormField>,
    #[serde(default = "default_submit")]
    pub submit: FieldSelector,
    #[serde(default = "default_success")]
    pub success: FieldSelector,
    #[serde(default = "default_errors")]
    pub errors: FieldSelector,
}

impl FormSpec {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            submit: default_submit(),
            success: default_success(),
            errors: default_errors(),
        }
    }
}

/// Values resolved for one row, in form order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub row_number: u32,
    pub fields: Vec<(String, FieldInput)>,
}

/// Per-row submission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionState {
    Navigate,
    LocateFields,
    FillFields,
    Submit,
    Confirm,
    Done,
    Skipped,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Done | SubmissionState::Skipped | SubmissionState::Failed
        )
    }

    /// Next state on success. Dry-run turns `Submit` into `Skipped`.
    pub fn advance(self, dry_run: bool) -> Self {
        match self {
            SubmissionState::Navigate => SubmissionState::LocateFields,
            SubmissionState::LocateFields => SubmissionState::FillFields,
            SubmissionState::FillFields if dry_run => SubmissionState::Skipped,
            SubmissionState::FillFields => SubmissionState::Submit,
            SubmissionState::Submit => SubmissionState::Confirm,
            SubmissionState::Confirm => SubmissionState::Done,
            terminal => terminal,
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Navigate => "Navigate",
            SubmissionState::LocateFields => "Locate fields",
            SubmissionState::FillFields => "Fill fields",
            SubmissionState::Submit => "Submit",
            SubmissionState::Confirm => "Confirm",
            SubmissionState::Done => "Done",
            SubmissionState::Skipped => "Skipped",
            SubmissionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// What to read from an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "read", content = "name")]
pub enum ReadMode {
    /// `value` property of an input
    Value,
    /// Rendered text
    Text,
    /// Attribute, falling back to text when absent
    Attribute(String),
}

/// Post-processing of a read value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "pick")]
pub enum Pick {
    #[default]
    Whole,
    /// `index`-th part after removing `×`/newlines and splitting on `separator`
    Part { index: usize, separator: String },
    /// Last non-empty line not starting with `skip_prefix` (case-insensitive)
    LastLine { skip_prefix: String },
}

impl Pick {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Pick::Whole => raw.trim().to_string(),
            Pick::Part { index, separator } => {
                let cleaned = clean_select_label(raw);
                if cleaned.is_empty() {
                    return String::new();
                }
                cleaned
                    .split(separator.as_str())
                    .nth(*index)
                    .map(|p| p.trim().to_string())
                    .unwrap_or_default()
            }
            Pick::LastLine { skip_prefix } => {
                let prefix = skip_prefix.to_lowercase();
                raw.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .filter(|l| prefix.is_empty() || !l.to_lowercase().starts_with(&prefix))
                    .last()
                    .unwrap_or("")
                    .to_string()
            }
        }
    }
}

/// select2 renders a clear button `×` and may wrap lines
pub fn clean_select_label(raw: &str) -> String {
    raw.replace('×', "").replace('\n', " ").trim().to_string()
}

/// One column of the extraction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractField {
    pub header: String,
    pub selector: FieldSelector,
    pub read: ReadMode,
    #[serde(default)]
    pub pick: Pick,
}

/// Django admin change-page URL for an entity
pub fn change_url(admin_url: &str, id: &str) -> String {
    format!("{}/{}/change/", admin_url.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> FormContext {
        FormContext {
            parent_search_text: "Gudauri".into(),
            parent_visible_text: "6053839, Gudauri".into(),
            entity_type_visible_text: "Ski lift".into(),
        }
    }

    #[test]
    fn test_resolve_column_text() {
        let field = FormField {
            name: "name".into(),
            selector: FieldSelector::Id("id_translations-0-name".into()),
            kind: FieldKind::Text,
            value: ValueSource::Column { index: 0 },
            optional: false,
        };
        let row = InputRow::new(2, vec!["Gudauri Lift 3".into()]);
        assert_eq!(
            field.resolve(&row, &context()),
            FieldInput::Text {
                value: "Gudauri Lift 3".into()
            }
        );
    }

    #[test]
    fn test_resolve_parent_autocomplete() {
        let field = FormField {
            name: "parent".into(),
            selector: FieldSelector::Css(".field-parent .select2".into()),
            kind: FieldKind::Autocomplete,
            value: ValueSource::ParentRegion,
            optional: false,
        };
        let row = InputRow::new(2, vec![]);
        assert_eq!(
            field.resolve(&row, &context()),
            FieldInput::Search {
                search_text: "Gudauri".into(),
                visible_text: "6053839, Gudauri".into()
            }
        );
    }

    #[test]
    fn test_resolve_entity_type_select() {
        let field = FormField {
            name: "type".into(),
            selector: FieldSelector::Name("type".into()),
            kind: FieldKind::Select,
            value: ValueSource::EntityType,
            optional: false,
        };
        let input = field.resolve(&InputRow::new(2, vec![]), &context());
        assert_eq!(
            input,
            FieldInput::Choice {
                visible_text: "Ski lift".into()
            }
        );
        assert!(!input.is_empty());
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut state = SubmissionState::Navigate;
        let mut seen = vec![state];
        while !state.is_terminal() {
            state = state.advance(false);
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                SubmissionState::Navigate,
                SubmissionState::LocateFields,
                SubmissionState::FillFields,
                SubmissionState::Submit,
                SubmissionState::Confirm,
                SubmissionState::Done,
            ]
        );
    }

    #[test]
    fn test_state_machine_dry_run_never_submits() {
        let mut state = SubmissionState::Navigate;
        while !state.is_terminal() {
            state = state.advance(true);
            assert_ne!(state, SubmissionState::Submit);
        }
        assert_eq!(state, SubmissionState::Skipped);
    }

    #[test]
    fn test_pick_parent_label() {
        let raw = "×\n6053839, Gudauri";
        let id = Pick::Part { index: 0, separator: ", ".into() };
        let name = Pick::Part { index: 1, separator: ", ".into() };
        assert_eq!(id.apply(raw), "6053839");
        assert_eq!(name.apply(raw), "Gudauri");
        assert_eq!(name.apply("×"), "");
        assert_eq!(name.apply("6053839"), "");
    }

    #[test]
    fn test_pick_country_last_line() {
        let raw = "Country:\n\nGE\n";
        let pick = Pick::LastLine { skip_prefix: "country".into() };
        assert_eq!(pick.apply(raw), "GE");
        assert_eq!(pick.apply("Country:"), "");
    }

    #[test]
    fn test_selector_locator() {
        assert_eq!(
            FieldSelector::Id("id_manual_lat_center".into()).locator(),
            ("css selector", "[id=\"id_manual_lat_center\"]".to_string())
        );
        assert_eq!(FieldSelector::XPath("//a".into()).locator().0, "xpath");
    }

    #[test]
    fn test_change_url() {
        assert_eq!(
            change_url("https://admin.example/geo/region/", "42"),
            "https://admin.example/geo/region/42/change/"
        );
    }

    #[test]
    fn test_form_spec_defaults_from_json() {
        let json = r#"{"fields": [{"name": "lat", "selector": {"by": "id", "value": "id_lat"},
                       "kind": "text", "value": {"from": "column", "index": 1}}]}"#;
        let spec: FormSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.submit, FieldSelector::Name("_save".into()));
        assert_eq!(spec.fields[0].value, ValueSource::Column { index: 1 });
        assert!(!spec.fields[0].optional);
    }
}
