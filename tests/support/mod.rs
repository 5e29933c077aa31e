//! Test doubles for the geocoders and the admin console

#![allow(dead_code)]

use async_trait::async_trait;
use geo_sheet_sync::admin::{AdminConsole, Confirmation, FieldHandle};
use geo_sheet_sync::error::{GeoSyncError, Result};
use geo_sheet_sync::geocode::{NameLocalizer, PlaceLookup};
use geo_sync_common::{FieldInput, FieldSelector, FormSpec, LocalizedPlace, Place, ReadMode};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn chair_lift() -> Place {
    Place {
        lat: Some(42.48),
        lon: Some(44.48),
        osm_id: Some(123),
        class: Some("aerialway".into()),
        kind: Some("chair_lift".into()),
        ..Default::default()
    }
}

enum Answer {
    Found(Place),
    Error(String),
}

/// Deterministic `PlaceLookup`: known queries answer, others find nothing
#[derive(Clone, Default)]
pub struct StubLookup {
    answers: Arc<Mutex<HashMap<String, Place>>>,
    errors: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(self, query: &str, place: Place) -> Self {
        self.answers.lock().unwrap().insert(query.to_string(), place);
        self
    }

    pub fn failing(self, query: &str, reason: &str) -> Self {
        self.errors
            .lock()
            .unwrap()
            .insert(query.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, query: &str) -> Option<Answer> {
        if let Some(reason) = self.errors.lock().unwrap().get(query) {
            return Some(Answer::Error(reason.clone()));
        }
        self.answers
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .map(Answer::Found)
    }
}

#[async_trait]
impl PlaceLookup for StubLookup {
    async fn lookup(&mut self, query: &str) -> Result<Option<Place>> {
        self.calls.lock().unwrap().push(query.to_string());
        match self.answer(query) {
            Some(Answer::Found(place)) => Ok(Some(place)),
            Some(Answer::Error(reason)) => Err(GeoSyncError::lookup(query, reason)),
            None => Ok(None),
        }
    }
}

#[derive(Clone, Default)]
pub struct StubLocalizer {
    answers: Arc<Mutex<HashMap<String, LocalizedPlace>>>,
    errors: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(self, query: &str, place: LocalizedPlace) -> Self {
        self.answers.lock().unwrap().insert(query.to_string(), place);
        self
    }

    pub fn failing(self, query: &str, reason: &str) -> Self {
        self.errors
            .lock()
            .unwrap()
            .insert(query.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NameLocalizer for StubLocalizer {
    async fn localize(&mut self, query: &str, language: &str) -> Result<Option<LocalizedPlace>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), language.to_string()));
        if let Some(reason) = self.errors.lock().unwrap().get(query) {
            return Err(GeoSyncError::lookup(query, reason));
        }
        Ok(self.answers.lock().unwrap().get(query).cloned())
    }
}

/// `AdminConsole` that records every call as a line of text
#[derive(Default)]
pub struct RecordingConsole {
    pub calls: Vec<String>,
    /// Selectors that never appear
    pub missing: HashSet<String>,
    /// Selector (Display form) -> value returned by `read`
    pub page: HashMap<String, String>,
    /// URLs whose pages fail to load
    pub broken_urls: HashSet<String>,
    /// URL after each `open`; `None` keeps the opened URL
    pub redirect: Option<String>,
    /// URL after a click, e.g. leaving the login page
    pub url_after_click: Option<String>,
    /// Error text shown after save
    pub reject_with: Option<String>,
    /// Driver connection gone: every `open` fails below the page level
    pub session_lost: bool,
    pub url: String,
    next_id: u32,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submits(&self) -> usize {
        self.calls.iter().filter(|c| c.starts_with("submit")).count()
    }

    /// Fill calls only, in order
    pub fn fills(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.starts_with("fill"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AdminConsole for RecordingConsole {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.calls.push(format!("open {}", url));
        if self.session_lost {
            return Err(GeoSyncError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "chromedriver connection refused",
            )));
        }
        if self.broken_urls.contains(url) {
            return Err(GeoSyncError::FormInteractionFailed(format!("{} did not load", url)));
        }
        self.url = self.redirect.clone().unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn locate(&mut self, selector: &FieldSelector) -> Result<FieldHandle> {
        let key = selector.to_string();
        self.calls.push(format!("locate {}", key));
        if self.missing.contains(&key) {
            return Err(GeoSyncError::FormInteractionFailed(format!(
                "element {} not found",
                key
            )));
        }
        Ok(FieldHandle {
            selector: selector.clone(),
            element: key,
        })
    }

    async fn fill(&mut self, field: &FieldHandle, input: &FieldInput) -> Result<()> {
        self.calls.push(format!("fill {} {}", field.selector, input));
        Ok(())
    }

    async fn click(&mut self, field: &FieldHandle) -> Result<()> {
        self.calls.push(format!("click {}", field.selector));
        if let Some(url) = &self.url_after_click {
            self.url = url.clone();
        }
        Ok(())
    }

    async fn read(&mut self, field: &FieldHandle, mode: &ReadMode) -> Result<String> {
        self.calls.push(format!("read {} {:?}", field.selector, mode));
        Ok(self
            .page
            .get(&field.selector.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn submit(&mut self, form: &FormSpec) -> Result<Confirmation> {
        self.calls.push(format!("submit {}", form.submit));
        if let Some(error) = &self.reject_with {
            return Err(GeoSyncError::FormInteractionFailed(error.clone()));
        }
        self.next_id += 1;
        let id = 7000 + self.next_id;
        Ok(Confirmation {
            message: format!("The region “{}” was added successfully.", id),
            url: format!("https://content.example/admin/geo/region/{}/change/", id),
            object_id: Some(id.to_string()),
        })
    }
}
